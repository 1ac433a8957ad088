use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

/// Shared across every observation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeOfDay {
    Morning,
    Noon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Noon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Noon => "Noon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeOfDay::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// Moderation state. Only external moderation tooling moves it off `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "approved" => Ok(Status::Approved),
            "rejected" => Ok(Status::Rejected),
            _ => Err(()),
        }
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|_| FromSqlError::InvalidType)
            }
        }
    };
}

text_enum_sql!(TimeOfDay);
text_enum_sql!(Status);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        if latitude.is_none() && longitude.is_none() {
            None
        } else {
            Some(Self {
                latitude,
                longitude,
            })
        }
    }
}

/// A single sighting record, shaped the same for every kind.
///
/// `subtype` holds the kind-specific classification keyed by its wire name
/// (`plantCategory`, `animalType`, ...), flattened into the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(rename = "_id")]
    pub id: String,
    pub category: String,
    #[serde(flatten)]
    pub subtype: BTreeMap<String, String>,
    /// `None` only when a listing projected the payload away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub date: NaiveDate,
    pub time_of_day: TimeOfDay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stats projection of an observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentObservation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub subtype: BTreeMap<String, String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
}

/// One row of a grouped count, `{ "_id": value, "count": n }` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "_id")]
    pub value: String,
    pub count: u64,
}

/// Consent decision for reusing a submitted photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CanUsePhoto {
    Yes,
    No,
}

impl CanUsePhoto {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanUsePhoto::Yes => "Yes",
            CanUsePhoto::No => "No",
        }
    }
}

impl FromStr for CanUsePhoto {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(CanUsePhoto::Yes),
            "No" => Ok(CanUsePhoto::No),
            _ => Err(()),
        }
    }
}

text_enum_sql!(CanUsePhoto);

/// Which collection an `observationId` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationType {
    Plant,
    Animal,
    Nature,
    Humanity,
}

impl ObservationType {
    pub const ALL: [ObservationType; 4] = [
        ObservationType::Plant,
        ObservationType::Animal,
        ObservationType::Nature,
        ObservationType::Humanity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::Plant => "plant",
            ObservationType::Animal => "animal",
            ObservationType::Nature => "nature",
            ObservationType::Humanity => "humanity",
        }
    }
}

impl FromStr for ObservationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObservationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

text_enum_sql!(ObservationType);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoConsent {
    #[serde(rename = "_id")]
    pub id: String,
    pub observation_id: String,
    pub observation_type: ObservationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    pub can_use_photo: CanUsePhoto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_credit: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn timestamp_from_sql(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub fn date_to_sql(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn date_from_sql(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
