use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::models::{self, timestamp_to_sql, Observation, Status};
use crate::error::{AppError, AppResult};
use crate::observations::kind::Kind;
use crate::observations::repository::{ObservationRepository, Projection};
use crate::observations::stats::{Stats, RECENT_LIMIT};
use crate::observations::validation::{validate_new, validate_patch};

/// The CRUD engine behind every observation kind.
#[derive(Clone)]
pub struct ObservationService {
    repo: Arc<dyn ObservationRepository>,
}

impl ObservationService {
    pub fn new(repo: Arc<dyn ObservationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, kind: Kind, body: &Map<String, Value>) -> AppResult<Observation> {
        let desc = kind.descriptor();
        let input = validate_new(desc, body)?;

        tracing::info!(
            category = desc.category,
            subtype = ?input.subtype,
            date = %input.date,
            time_of_day = input.time_of_day.as_str(),
            photo_kb = %format!("{:.2}", input.photo.len() as f64 / 1024.0),
            has_location = input.location.is_some(),
            "Creating observation"
        );

        let now = models::now();
        let observation = Observation {
            id: Uuid::now_v7().to_string(),
            category: desc.category.to_string(),
            subtype: input.subtype,
            photo: Some(input.photo),
            date: input.date,
            time_of_day: input.time_of_day,
            description: input.description,
            location: input.location,
            common_name: input.common_name,
            scientific_name: input.scientific_name,
            // Owner linkage is managed outside this service.
            user_id: None,
            status: Status::Pending,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(desc, &observation).await?;
        tracing::info!("{} observation created: {}", desc.category, observation.id);

        Ok(observation)
    }

    pub async fn list(&self, kind: Kind) -> AppResult<Vec<Observation>> {
        let desc = kind.descriptor();
        Ok(self.repo.list(desc, None, list_projection(kind)).await?)
    }

    pub async fn get(&self, kind: Kind, id: &str) -> AppResult<Observation> {
        let desc = kind.descriptor();
        if !is_well_formed(id) {
            return Err(AppError::NotFound(desc.not_found.to_string()));
        }

        self.repo
            .find(desc, id)
            .await?
            .ok_or_else(|| AppError::NotFound(desc.not_found.to_string()))
    }

    pub async fn update(
        &self,
        kind: Kind,
        id: &str,
        body: &Map<String, Value>,
    ) -> AppResult<Observation> {
        let desc = kind.descriptor();
        if !is_well_formed(id) {
            return Err(AppError::NotFound(desc.not_found.to_string()));
        }

        let patch = validate_patch(desc, body)?;
        let updated_at = timestamp_to_sql(&models::now());
        let observation = self
            .repo
            .update(desc, id, &patch, &updated_at)
            .await?
            .ok_or_else(|| AppError::NotFound(desc.not_found.to_string()))?;

        tracing::info!("{} observation updated: {}", desc.category, id);
        Ok(observation)
    }

    pub async fn delete(&self, kind: Kind, id: &str) -> AppResult<()> {
        let desc = kind.descriptor();
        if !is_well_formed(id) || !self.repo.delete(desc, id).await? {
            return Err(AppError::NotFound(desc.not_found.to_string()));
        }

        tracing::info!("{} observation deleted: {}", desc.category, id);
        Ok(())
    }

    pub async fn list_by_type(&self, kind: Kind, value: &str) -> AppResult<Vec<Observation>> {
        let desc = kind.descriptor();
        let records = self
            .repo
            .list(desc, Some(value), list_projection(kind))
            .await?;

        if let Some(prefix) = desc.empty_filter {
            if records.is_empty() {
                return Err(AppError::NotFound(format!("{}: {}", prefix, value)));
            }
        }

        Ok(records)
    }

    pub async fn stats(&self, kind: Kind) -> AppResult<Stats> {
        let desc = kind.descriptor();
        let total = self.repo.count(desc).await?;
        let type_stats = self.repo.count_by_type(desc).await?;
        let recent = self.repo.recent(desc, RECENT_LIMIT).await?;
        Ok(Stats::new(desc, total, type_stats, recent))
    }
}

fn list_projection(kind: Kind) -> Projection {
    if kind.descriptor().omit_photo_in_lists {
        Projection::WithoutPhoto
    } else {
        Projection::Full
    }
}

/// Ids are UUIDs; anything else cannot name a stored record.
fn is_well_formed(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::observations::repository::SqliteObservationRepository;
    use serde_json::json;

    fn service() -> ObservationService {
        let pool = db::test_pool();
        ObservationService::new(Arc::new(SqliteObservationRepository::new(pool)))
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn animal(animal_type: &str) -> Map<String, Value> {
        body(json!({
            "animalType": animal_type,
            "photo": "data:image/jpeg;base64,/9j/4AAQ",
            "date": "2024-05-01",
            "timeOfDay": "Morning",
        }))
    }

    fn activity(activity_type: &str) -> Map<String, Value> {
        body(json!({
            "activityType": activity_type,
            "photo": "data:image/jpeg;base64,/9j/4AAQ",
            "date": "2024-06-10",
            "timeOfDay": "Evening",
        }))
    }

    #[tokio::test]
    async fn create_assigns_identity_and_category() {
        let svc = service();
        let created = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();

        assert_eq!(created.category, "Animal");
        assert_eq!(created.subtype["animalType"], "Fox");
        assert_eq!(created.status, Status::Pending);
        assert_eq!(created.created_at, created.updated_at);
        assert!(Uuid::parse_str(&created.id).is_ok());
    }

    #[tokio::test]
    async fn create_ignores_client_supplied_owner() {
        let svc = service();
        let mut input = animal("Fox");
        input.insert("userId".into(), json!("someone-else"));

        let created = svc.create(Kind::Animal, &input).await.unwrap();
        assert_eq!(created.user_id, None);
        let fetched = svc.get(Kind::Animal, &created.id).await.unwrap();
        assert_eq!(fetched.user_id, None);
    }

    #[tokio::test]
    async fn fetched_record_equals_created_record() {
        let svc = service();
        let mut input = animal("Owl");
        input.insert("description".into(), json!("Perched on the fence"));
        input.insert("location".into(), json!({ "latitude": 51.5, "longitude": -0.12 }));
        input.insert("scientificName".into(), json!("Strix aluco"));
        let created = svc.create(Kind::Animal, &input).await.unwrap();

        let fetched = svc.get(Kind::Animal, &created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let svc = service();
        let mut input = animal("Fox");
        input.remove("photo");

        let err = svc.create(Kind::Animal, &input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(svc.list(Kind::Animal).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_id_is_not_found() {
        let svc = service();
        let err = svc.get(Kind::Nature, "not-an-id").await.unwrap_err();
        match err {
            AppError::NotFound(msg) => assert_eq!(msg, "Nature observation not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found_and_repeat_delete_fails() {
        let svc = service();
        let created = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();

        svc.delete(Kind::Animal, &created.id).await.unwrap();
        assert!(matches!(
            svc.get(Kind::Animal, &created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(Kind::Animal, &created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let svc = service();
        let first = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();
        let second = svc.create(Kind::Animal, &animal("Owl")).await.unwrap();
        let third = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();

        let ids: Vec<_> = svc
            .list(Kind::Animal)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn list_by_type_filters_and_orders() {
        let svc = service();
        let older = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();
        svc.create(Kind::Animal, &animal("Owl")).await.unwrap();
        let newer = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();

        let foxes = svc.list_by_type(Kind::Animal, "Fox").await.unwrap();
        assert_eq!(foxes.len(), 2);
        assert!(foxes.iter().all(|o| o.subtype["animalType"] == "Fox"));
        assert_eq!(foxes[0].id, newer.id);
        assert_eq!(foxes[1].id, older.id);

        assert!(svc.list_by_type(Kind::Animal, "Badger").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_plant_category_is_not_found() {
        let svc = service();
        match svc.list_by_type(Kind::Plant, "Terrestrial").await {
            Err(AppError::NotFound(msg)) => {
                assert_eq!(msg, "No plants found for category: Terrestrial")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn activity_listings_omit_photo() {
        let svc = service();
        let created = svc
            .create(Kind::HumanActivity, &activity("fire"))
            .await
            .unwrap();
        assert!(created.photo.is_some());

        let listed = svc.list(Kind::HumanActivity).await.unwrap();
        assert_eq!(listed[0].photo, None);
        let by_type = svc.list_by_type(Kind::HumanActivity, "fire").await.unwrap();
        assert_eq!(by_type[0].photo, None);

        let fetched = svc.get(Kind::HumanActivity, &created.id).await.unwrap();
        assert_eq!(fetched.photo, created.photo);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let svc = service();
        let created = svc.create(Kind::Animal, &animal("Fox")).await.unwrap();

        let updated = svc
            .update(
                Kind::Animal,
                &created.id,
                &body(json!({ "animalType": "Badger", "category": "Plant", "_id": "x" })),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.category, "Animal");
        assert_eq!(updated.subtype["animalType"], "Badger");
        assert_eq!(updated.photo, created.photo);
        assert_eq!(updated.date, created.date);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_validates_supplied_enums() {
        let svc = service();
        let created = svc
            .create(Kind::HumanActivity, &activity("mining"))
            .await
            .unwrap();

        let err = svc
            .update(
                Kind::HumanActivity,
                &created.id,
                &body(json!({ "timeOfDay": "Dawn" })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let svc = service();
        let id = Uuid::now_v7().to_string();
        let err = svc
            .update(Kind::Plant, &id, &body(json!({ "plantType": "fungi" })))
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(msg) => assert_eq!(msg, "Plant observation not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn stats_group_by_type_and_limit_recent() {
        let svc = service();
        for name in ["Fox", "Owl", "Fox", "Owl", "Fox", "Heron"] {
            svc.create(Kind::Animal, &animal(name)).await.unwrap();
        }

        let stats = svc.stats(Kind::Animal).await.unwrap();
        assert_eq!(stats.total, 6);
        let groups: Vec<_> = stats
            .type_stats
            .iter()
            .map(|t| (t.value.as_str(), t.count))
            .collect();
        assert_eq!(groups, vec![("Fox", 3), ("Owl", 2), ("Heron", 1)]);
        assert_eq!(stats.recent.len(), RECENT_LIMIT);
        assert_eq!(stats.recent[0].subtype["animalType"], "Heron");
        assert!(stats.category_stats.is_none());
    }

    #[tokio::test]
    async fn activity_stats_include_buckets() {
        let svc = service();
        for t in ["fire", "deforestation", "poaching"] {
            svc.create(Kind::HumanActivity, &activity(t)).await.unwrap();
        }

        let stats = svc.stats(Kind::HumanActivity).await.unwrap();
        let buckets = stats.category_stats.unwrap();
        assert_eq!(buckets[0].value, "Environmental Impacts");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].value, "Wildlife Related");
    }
}
