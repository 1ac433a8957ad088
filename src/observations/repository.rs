// Repository pattern - every observation collection goes through here
use std::collections::BTreeMap;

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use crate::db::models::{
    date_from_sql, date_to_sql, timestamp_from_sql, timestamp_to_sql, Location, Observation,
    RecentObservation, TypeCount,
};
use crate::db::StoreError;
use crate::observations::kind::KindDescriptor;
use crate::observations::validation::ObservationPatch;
use crate::state::DbPool;

/// Whether a read returns the photo payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Full,
    WithoutPhoto,
}

/// Storage operations shared by all observation kinds.
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    async fn insert(
        &self,
        kind: &'static KindDescriptor,
        observation: &Observation,
    ) -> Result<(), StoreError>;

    /// Newest first; `filter` matches the kind's filter field exactly.
    async fn list(
        &self,
        kind: &'static KindDescriptor,
        filter: Option<&str>,
        projection: Projection,
    ) -> Result<Vec<Observation>, StoreError>;

    async fn find(
        &self,
        kind: &'static KindDescriptor,
        id: &str,
    ) -> Result<Option<Observation>, StoreError>;

    /// Applies the patch and returns the updated record, or `None` if the id
    /// does not exist.
    async fn update(
        &self,
        kind: &'static KindDescriptor,
        id: &str,
        patch: &ObservationPatch,
        updated_at: &str,
    ) -> Result<Option<Observation>, StoreError>;

    async fn delete(&self, kind: &'static KindDescriptor, id: &str) -> Result<bool, StoreError>;

    async fn count(&self, kind: &'static KindDescriptor) -> Result<u64, StoreError>;

    /// Counts grouped by the filter field, largest group first.
    async fn count_by_type(
        &self,
        kind: &'static KindDescriptor,
    ) -> Result<Vec<TypeCount>, StoreError>;

    async fn recent(
        &self,
        kind: &'static KindDescriptor,
        limit: usize,
    ) -> Result<Vec<RecentObservation>, StoreError>;
}

/// SQLite implementation
pub struct SqliteObservationRepository {
    pool: DbPool,
}

impl SqliteObservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Column order shared by every SELECT below: the common prefix, then the
// kind's subtype columns in descriptor order.
const COMMON_COLUMNS: &str = "id, category, date, time_of_day, description, latitude, \
     longitude, common_name, scientific_name, user_id, status, created_at, updated_at";
const COMMON_COUNT: usize = 13;

fn select_columns(kind: &KindDescriptor, projection: Projection) -> String {
    let photo = match projection {
        Projection::Full => "photo",
        Projection::WithoutPhoto => "NULL AS photo",
    };
    let mut columns = format!("{}, {}", COMMON_COLUMNS, photo);
    for field in kind.subtypes {
        columns.push_str(", ");
        columns.push_str(field.column);
    }
    columns
}

fn observation_from_row(kind: &KindDescriptor, row: &Row<'_>) -> rusqlite::Result<Observation> {
    let mut subtype = BTreeMap::new();
    for (i, field) in kind.subtypes.iter().enumerate() {
        subtype.insert(field.name.to_string(), row.get(COMMON_COUNT + 1 + i)?);
    }

    Ok(Observation {
        id: row.get(0)?,
        category: row.get(1)?,
        subtype,
        photo: row.get(COMMON_COUNT)?,
        date: date_from_sql(row, 2)?,
        time_of_day: row.get(3)?,
        description: row.get(4)?,
        location: Location::from_columns(row.get(5)?, row.get(6)?),
        common_name: row.get(7)?,
        scientific_name: row.get(8)?,
        user_id: row.get(9)?,
        status: row.get(10)?,
        created_at: timestamp_from_sql(row, 11)?,
        updated_at: timestamp_from_sql(row, 12)?,
    })
}

#[async_trait]
impl ObservationRepository for SqliteObservationRepository {
    async fn insert(
        &self,
        kind: &'static KindDescriptor,
        observation: &Observation,
    ) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        let mut columns = String::from(COMMON_COLUMNS);
        columns.push_str(", photo");
        let mut values: Vec<SqlValue> = vec![
            SqlValue::Text(observation.id.clone()),
            SqlValue::Text(observation.category.clone()),
            SqlValue::Text(date_to_sql(&observation.date)),
            SqlValue::Text(observation.time_of_day.as_str().into()),
            observation.description.clone().map_or(SqlValue::Null, SqlValue::Text),
            observation
                .location
                .and_then(|l| l.latitude)
                .map_or(SqlValue::Null, SqlValue::Real),
            observation
                .location
                .and_then(|l| l.longitude)
                .map_or(SqlValue::Null, SqlValue::Real),
            observation.common_name.clone().map_or(SqlValue::Null, SqlValue::Text),
            observation
                .scientific_name
                .clone()
                .map_or(SqlValue::Null, SqlValue::Text),
            observation.user_id.clone().map_or(SqlValue::Null, SqlValue::Text),
            SqlValue::Text(observation.status.as_str().into()),
            SqlValue::Text(timestamp_to_sql(&observation.created_at)),
            SqlValue::Text(timestamp_to_sql(&observation.updated_at)),
            observation.photo.clone().map_or(SqlValue::Null, SqlValue::Text),
        ];
        for field in kind.subtypes {
            columns.push_str(", ");
            columns.push_str(field.column);
            values.push(
                observation
                    .subtype
                    .get(field.name)
                    .cloned()
                    .map_or(SqlValue::Null, SqlValue::Text),
            );
        }

        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            kind.table, columns, placeholders
        );

        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    async fn list(
        &self,
        kind: &'static KindDescriptor,
        filter: Option<&str>,
        projection: Projection,
    ) -> Result<Vec<Observation>, StoreError> {
        let conn = self.pool.get()?;
        let columns = select_columns(kind, projection);

        let records = match filter {
            Some(value) => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE {} = ?1 ORDER BY created_at DESC, rowid DESC",
                    columns,
                    kind.table,
                    kind.filter().column
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![value], |row| observation_from_row(kind, row))?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM {} ORDER BY created_at DESC, rowid DESC",
                    columns, kind.table
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| observation_from_row(kind, row))?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(records)
    }

    async fn find(
        &self,
        kind: &'static KindDescriptor,
        id: &str,
    ) -> Result<Option<Observation>, StoreError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            select_columns(kind, Projection::Full),
            kind.table
        );

        let record = conn
            .query_row(&sql, params![id], |row| observation_from_row(kind, row))
            .optional()?;
        Ok(record)
    }

    async fn update(
        &self,
        kind: &'static KindDescriptor,
        id: &str,
        patch: &ObservationPatch,
        updated_at: &str,
    ) -> Result<Option<Observation>, StoreError> {
        let conn = self.pool.get()?;

        let mut assignments = patch.assignments();
        assignments.push(("updated_at", SqlValue::Text(updated_at.to_string())));

        let set = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} RETURNING {}",
            kind.table,
            set,
            assignments.len() + 1,
            select_columns(kind, Projection::Full)
        );

        let mut values: Vec<SqlValue> = assignments.into_iter().map(|(_, v)| v).collect();
        values.push(SqlValue::Text(id.to_string()));

        let record = conn
            .query_row(&sql, params_from_iter(values), |row| {
                observation_from_row(kind, row)
            })
            .optional()?;
        Ok(record)
    }

    async fn delete(&self, kind: &'static KindDescriptor, id: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table);
        let rows = conn.execute(&sql, params![id])?;
        Ok(rows > 0)
    }

    async fn count(&self, kind: &'static KindDescriptor) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn count_by_type(
        &self,
        kind: &'static KindDescriptor,
    ) -> Result<Vec<TypeCount>, StoreError> {
        let conn = self.pool.get()?;
        let column = kind.filter().column;
        let sql = format!(
            "SELECT {col}, COUNT(*) AS n FROM {table} GROUP BY {col} ORDER BY n DESC, {col} ASC",
            col = column,
            table = kind.table
        );

        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| {
                Ok(TypeCount {
                    value: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    async fn recent(
        &self,
        kind: &'static KindDescriptor,
        limit: usize,
    ) -> Result<Vec<RecentObservation>, StoreError> {
        let conn = self.pool.get()?;

        let mut columns = String::from("id, date, created_at, common_name");
        for field in kind.subtypes {
            columns.push_str(", ");
            columns.push_str(field.column);
        }
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            columns, kind.table
        );

        let mut stmt = conn.prepare(&sql)?;
        let recent = stmt
            .query_map(params![limit as i64], |row| {
                let mut subtype = BTreeMap::new();
                for (i, field) in kind.subtypes.iter().enumerate() {
                    subtype.insert(field.name.to_string(), row.get(4 + i)?);
                }
                let common_name: Option<String> = row.get(3)?;
                Ok(RecentObservation {
                    id: row.get(0)?,
                    subtype,
                    date: date_from_sql(row, 1)?,
                    created_at: timestamp_from_sql(row, 2)?,
                    common_name: common_name.filter(|_| kind.accepts_names),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recent)
    }
}
