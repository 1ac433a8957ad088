use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::consent::repository::ConsentRepository;
use crate::db::models::{self, CanUsePhoto, ObservationType, PhotoConsent};
use crate::error::{AppError, AppResult};

/// Where the client should go once consent is recorded.
pub const DASHBOARD_REDIRECT: &str = "/dashboard";

/// Route segment to observation type, for `/api/{type}/{id}/photo-info`.
const ROUTE_TOKENS: &[(&str, ObservationType)] = &[
    ("plants", ObservationType::Plant),
    ("animals", ObservationType::Animal),
    ("nature", ObservationType::Nature),
    ("human-activities", ObservationType::Humanity),
];

pub fn observation_type_for_route(token: &str) -> Option<ObservationType> {
    ROUTE_TOKENS
        .iter()
        .find(|(t, _)| *t == token)
        .map(|(_, observation_type)| *observation_type)
}

/// Only an explicit "no" withholds consent; anything else, including a
/// missing value, grants it.
pub fn normalize_can_use_photo(value: Option<&Value>) -> CanUsePhoto {
    match value {
        Some(Value::Bool(false)) => CanUsePhoto::No,
        Some(Value::String(s)) if matches!(s.as_str(), "false" | "No" | "no") => CanUsePhoto::No,
        _ => CanUsePhoto::Yes,
    }
}

/// Consent fields shared by both submission routes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentDetails {
    pub contact_info: Option<String>,
    pub can_use_photo: Option<Value>,
    pub photo_credit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSubmission {
    pub observation_id: Option<String>,
    pub observation_type: Option<String>,
    #[serde(flatten)]
    pub details: ConsentDetails,
}

#[derive(Debug, Clone)]
pub struct ConsentReceipt {
    pub consent: PhotoConsent,
    pub redirect_to: &'static str,
}

/// Records consent against an observation by id and type. The referenced
/// observation is not looked up.
#[derive(Clone)]
pub struct ConsentService {
    repo: Arc<dyn ConsentRepository>,
}

impl ConsentService {
    pub fn new(repo: Arc<dyn ConsentRepository>) -> Self {
        Self { repo }
    }

    pub async fn submit(&self, submission: ConsentSubmission) -> AppResult<ConsentReceipt> {
        let observation_id = non_blank(submission.observation_id);
        let observation_type = non_blank(submission.observation_type);
        let (Some(observation_id), Some(observation_type)) = (observation_id, observation_type)
        else {
            return Err(AppError::invalid(
                "observationId and observationType are required",
            ));
        };

        let observation_type: ObservationType = observation_type.parse().map_err(|()| {
            AppError::invalid(format!("Invalid observation type: {}", observation_type))
        })?;

        let details = submission.details;
        let now = models::now();
        let consent = PhotoConsent {
            id: Uuid::now_v7().to_string(),
            observation_id,
            observation_type,
            contact_info: non_blank(details.contact_info),
            can_use_photo: normalize_can_use_photo(details.can_use_photo.as_ref()),
            photo_credit: non_blank(details.photo_credit),
            submitted_at: now,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(&consent).await?;
        tracing::info!(
            observation_type = %consent.observation_type,
            observation_id = %consent.observation_id,
            can_use_photo = consent.can_use_photo.as_str(),
            "Photo information submitted"
        );

        Ok(ConsentReceipt {
            consent,
            redirect_to: DASHBOARD_REDIRECT,
        })
    }

    /// Submission addressed by route segment (`plants`, `human-activities`, ...)
    /// instead of observation type.
    pub async fn submit_via_typed_route(
        &self,
        token: &str,
        observation_id: &str,
        details: ConsentDetails,
    ) -> AppResult<ConsentReceipt> {
        let observation_type = observation_type_for_route(token)
            .ok_or_else(|| AppError::invalid(format!("Invalid observation type: {}", token)))?;

        self.submit(ConsentSubmission {
            observation_id: Some(observation_id.to_string()),
            observation_type: Some(observation_type.as_str().to_string()),
            details,
        })
        .await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::repository::SqliteConsentRepository;
    use crate::db;
    use crate::observations::Kind;
    use serde_json::json;

    fn service() -> (ConsentService, Arc<SqliteConsentRepository>) {
        let repo = Arc::new(SqliteConsentRepository::new(db::test_pool()));
        (ConsentService::new(repo.clone()), repo)
    }

    fn message_of(err: AppError) -> String {
        match err {
            AppError::Validation { message, .. } => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn explicit_no_values_withhold_consent() {
        for value in [json!(false), json!("false"), json!("No"), json!("no")] {
            assert_eq!(normalize_can_use_photo(Some(&value)), CanUsePhoto::No, "{}", value);
        }
    }

    #[test]
    fn everything_else_grants_consent() {
        for value in [
            json!(true),
            json!("yes"),
            json!("anything"),
            json!("NO"),
            json!(0),
            json!(null),
        ] {
            assert_eq!(normalize_can_use_photo(Some(&value)), CanUsePhoto::Yes, "{}", value);
        }
        assert_eq!(normalize_can_use_photo(None), CanUsePhoto::Yes);
    }

    #[test]
    fn route_tokens_map_to_observation_types() {
        assert_eq!(observation_type_for_route("plants"), Some(ObservationType::Plant));
        assert_eq!(observation_type_for_route("animals"), Some(ObservationType::Animal));
        assert_eq!(observation_type_for_route("nature"), Some(ObservationType::Nature));
        assert_eq!(
            observation_type_for_route("human-activities"),
            Some(ObservationType::Humanity)
        );
        assert_eq!(observation_type_for_route("humanity"), None);
        assert_eq!(observation_type_for_route("plant"), None);
    }

    #[test]
    fn every_kind_route_resolves_to_its_consent_type() {
        for kind in Kind::ALL {
            let desc = kind.descriptor();
            assert_eq!(observation_type_for_route(desc.route), Some(desc.consent_type));
        }
    }

    #[test]
    fn submission_reads_camel_case_body() {
        let submission: ConsentSubmission = serde_json::from_value(json!({
            "observationId": "abc",
            "observationType": "animal",
            "contactInfo": "me@example.org",
            "canUsePhoto": false,
            "photoCredit": "A. Birder",
        }))
        .unwrap();
        assert_eq!(submission.observation_id.as_deref(), Some("abc"));
        assert_eq!(submission.details.can_use_photo, Some(json!(false)));
        assert_eq!(submission.details.photo_credit.as_deref(), Some("A. Birder"));
    }

    #[tokio::test]
    async fn submit_persists_normalized_record() {
        let (svc, repo) = service();
        let receipt = svc
            .submit(ConsentSubmission {
                observation_id: Some("obs-1".into()),
                observation_type: Some("plant".into()),
                details: ConsentDetails {
                    contact_info: Some("  me@example.org ".into()),
                    can_use_photo: Some(json!("no")),
                    photo_credit: None,
                },
            })
            .await
            .unwrap();

        assert_eq!(receipt.redirect_to, "/dashboard");
        assert_eq!(receipt.consent.can_use_photo, CanUsePhoto::No);
        assert_eq!(receipt.consent.contact_info.as_deref(), Some("me@example.org"));

        let stored = repo
            .for_observation(ObservationType::Plant, "obs-1")
            .await
            .unwrap();
        assert_eq!(stored, vec![receipt.consent]);
    }

    #[tokio::test]
    async fn missing_reference_is_rejected() {
        let (svc, _) = service();
        let err = svc
            .submit(ConsentSubmission {
                observation_id: Some("obs-1".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(message_of(err), "observationId and observationType are required");
    }

    #[tokio::test]
    async fn unknown_observation_type_is_rejected() {
        let (svc, _) = service();
        let err = svc
            .submit(ConsentSubmission {
                observation_id: Some("obs-1".into()),
                observation_type: Some("fungus".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(message_of(err), "Invalid observation type: fungus");
    }

    #[tokio::test]
    async fn typed_route_maps_token_and_delegates() {
        let (svc, _) = service();
        let receipt = svc
            .submit_via_typed_route("human-activities", "obs-9", ConsentDetails::default())
            .await
            .unwrap();
        assert_eq!(receipt.consent.observation_type, ObservationType::Humanity);
        assert_eq!(receipt.consent.observation_id, "obs-9");
        assert_eq!(receipt.consent.can_use_photo, CanUsePhoto::Yes);
    }

    #[tokio::test]
    async fn typed_route_rejects_unknown_token() {
        let (svc, _) = service();
        let err = svc
            .submit_via_typed_route("fungi", "obs-9", ConsentDetails::default())
            .await
            .unwrap_err();
        assert_eq!(message_of(err), "Invalid observation type: fungi");
    }

    #[tokio::test]
    async fn repeated_submissions_append() {
        let (svc, repo) = service();
        for _ in 0..3 {
            svc.submit_via_typed_route("nature", "obs-2", ConsentDetails::default())
                .await
                .unwrap();
        }
        let stored = repo
            .for_observation(ObservationType::Nature, "obs-2")
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
    }
}
