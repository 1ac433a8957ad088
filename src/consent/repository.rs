use async_trait::async_trait;
use rusqlite::params;

use crate::db::models::{timestamp_to_sql, PhotoConsent};
#[cfg(test)]
use crate::db::models::{timestamp_from_sql, ObservationType};
use crate::db::StoreError;
use crate::state::DbPool;

/// Append-only store of photo consent records.
#[async_trait]
pub trait ConsentRepository: Send + Sync {
    async fn insert(&self, consent: &PhotoConsent) -> Result<(), StoreError>;
}

pub struct SqliteConsentRepository {
    pool: DbPool,
}

impl SqliteConsentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsentRepository for SqliteConsentRepository {
    async fn insert(&self, consent: &PhotoConsent) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO photo_information
             (id, observation_id, observation_type, contact_info, can_use_photo, photo_credit,
              submitted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                consent.id,
                consent.observation_id,
                consent.observation_type,
                consent.contact_info,
                consent.can_use_photo,
                consent.photo_credit,
                timestamp_to_sql(&consent.submitted_at),
                timestamp_to_sql(&consent.created_at),
                timestamp_to_sql(&consent.updated_at),
            ],
        )?;

        Ok(())
    }
}

#[cfg(test)]
impl SqliteConsentRepository {
    /// All consent records naming one observation, oldest first.
    pub async fn for_observation(
        &self,
        observation_type: ObservationType,
        observation_id: &str,
    ) -> Result<Vec<PhotoConsent>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, observation_id, observation_type, contact_info, can_use_photo,
                    photo_credit, submitted_at, created_at, updated_at
             FROM photo_information
             WHERE observation_type = ?1 AND observation_id = ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let records = stmt
            .query_map(params![observation_type, observation_id], |row| {
                Ok(PhotoConsent {
                    id: row.get(0)?,
                    observation_id: row.get(1)?,
                    observation_type: row.get(2)?,
                    contact_info: row.get(3)?,
                    can_use_photo: row.get(4)?,
                    photo_credit: row.get(5)?,
                    submitted_at: timestamp_from_sql(row, 6)?,
                    created_at: timestamp_from_sql(row, 7)?,
                    updated_at: timestamp_from_sql(row, 8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
