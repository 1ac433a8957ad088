use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

use crate::db::models::{date_to_sql, Location, TimeOfDay};
use crate::error::{AppError, AppResult};
use crate::observations::kind::{KindDescriptor, SubtypeField};

/// Validated fields of a create request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    pub subtype: BTreeMap<String, String>,
    pub photo: String,
    pub date: NaiveDate,
    pub time_of_day: TimeOfDay,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
}

/// Validated fields of a partial update. Outer `None` leaves the stored
/// value alone; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationPatch {
    pub subtype: Vec<(&'static SubtypeField, String)>,
    pub photo: Option<String>,
    pub date: Option<NaiveDate>,
    pub time_of_day: Option<TimeOfDay>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<Location>>,
    pub common_name: Option<Option<String>>,
    pub scientific_name: Option<Option<String>>,
}

impl ObservationPatch {
    /// Column assignments for an `UPDATE ... SET` clause.
    pub fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut set: Vec<(&'static str, SqlValue)> = self
            .subtype
            .iter()
            .map(|(field, value)| (field.column, SqlValue::Text(value.clone())))
            .collect();

        if let Some(photo) = &self.photo {
            set.push(("photo", SqlValue::Text(photo.clone())));
        }
        if let Some(date) = &self.date {
            set.push(("date", SqlValue::Text(date_to_sql(date))));
        }
        if let Some(time_of_day) = &self.time_of_day {
            set.push(("time_of_day", SqlValue::Text(time_of_day.as_str().into())));
        }
        if let Some(description) = &self.description {
            set.push(("description", optional_text(description)));
        }
        if let Some(location) = &self.location {
            let (lat, lng) = match location {
                Some(loc) => (loc.latitude, loc.longitude),
                None => (None, None),
            };
            set.push(("latitude", lat.map_or(SqlValue::Null, SqlValue::Real)));
            set.push(("longitude", lng.map_or(SqlValue::Null, SqlValue::Real)));
        }
        if let Some(common_name) = &self.common_name {
            set.push(("common_name", optional_text(common_name)));
        }
        if let Some(scientific_name) = &self.scientific_name {
            set.push(("scientific_name", optional_text(scientific_name)));
        }
        set
    }
}

fn optional_text(value: &Option<String>) -> SqlValue {
    value.clone().map_or(SqlValue::Null, SqlValue::Text)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (taken in UTC).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc).date_naive())
    })
}

/// Walks a request body collecting one message per offending field.
struct Checker<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(body: &'a Map<String, Value>) -> Self {
        Self {
            body,
            errors: Vec::new(),
        }
    }

    fn supplied(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    /// Non-blank string; absent, null, blank, or non-string values fail.
    fn required_text(&mut self, key: &str, label: &str) -> Option<String> {
        match self.body.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => {
                self.errors.push(format!("{} is required", label));
                None
            }
        }
    }

    fn subtype(&mut self, field: &SubtypeField) -> Option<String> {
        let value = self.required_text(field.name, field.label)?;
        if field.accepts(&value) {
            Some(value)
        } else {
            self.errors.push(format!(
                "Invalid {}: {}",
                field.label.to_lowercase(),
                value
            ));
            None
        }
    }

    fn date(&mut self) -> Option<NaiveDate> {
        let raw = self.required_text("date", "Date")?;
        let parsed = parse_date(&raw);
        if parsed.is_none() {
            self.errors.push(format!("Invalid date: {}", raw));
        }
        parsed
    }

    fn time_of_day(&mut self) -> Option<TimeOfDay> {
        let raw = self.required_text("timeOfDay", "Time of day")?;
        match raw.parse() {
            Ok(t) => Some(t),
            Err(()) => {
                self.errors.push(format!("Invalid time of day: {}", raw));
                None
            }
        }
    }

    /// Trimmed optional string; blank collapses to `None`. Outer `None`
    /// when the key is absent.
    fn optional_text(&mut self, key: &str, label: &str) -> Option<Option<String>> {
        match self.body.get(key)? {
            Value::Null => Some(None),
            Value::String(s) => {
                let trimmed = s.trim();
                Some((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            _ => {
                self.errors.push(format!("{} must be a string", label));
                None
            }
        }
    }

    fn location(&mut self) -> Option<Option<Location>> {
        let value = self.body.get("location")?;
        let invalid = "Location must contain numeric latitude and longitude".to_string();
        match value {
            Value::Null => Some(None),
            Value::Object(coords) => {
                let read = |key: &str| match coords.get(key) {
                    None | Some(Value::Null) => Ok(None),
                    Some(v) => v.as_f64().map(Some).ok_or(()),
                };
                match (read("latitude"), read("longitude")) {
                    (Ok(latitude), Ok(longitude)) => {
                        Some(Location::from_columns(latitude, longitude))
                    }
                    _ => {
                        self.errors.push(invalid);
                        None
                    }
                }
            }
            _ => {
                self.errors.push(invalid);
                None
            }
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> AppResult<T> {
        if !self.errors.is_empty() {
            return Err(AppError::validation(self.errors));
        }
        value().ok_or_else(|| AppError::validation(vec!["Invalid request body".to_string()]))
    }
}

/// Validate a create request against the kind's descriptor.
pub fn validate_new(kind: &KindDescriptor, body: &Map<String, Value>) -> AppResult<NewObservation> {
    let mut check = Checker::new(body);

    let mut subtype = BTreeMap::new();
    let mut subtype_ok = true;
    for field in kind.subtypes {
        match check.subtype(field) {
            Some(value) => {
                subtype.insert(field.name.to_string(), value);
            }
            None => subtype_ok = false,
        }
    }

    let photo = check.required_text("photo", "Photo");
    let date = check.date();
    let time_of_day = check.time_of_day();
    let description = check.optional_text("description", "Description").flatten();
    let location = check.location().flatten();
    let (common_name, scientific_name) = if kind.accepts_names {
        (
            check.optional_text("commonName", "Common name").flatten(),
            check
                .optional_text("scientificName", "Scientific name")
                .flatten(),
        )
    } else {
        (None, None)
    };

    check.finish(|| {
        subtype_ok.then_some(())?;
        Some(NewObservation {
            subtype,
            photo: photo?,
            date: date?,
            time_of_day: time_of_day?,
            description,
            location,
            common_name,
            scientific_name,
        })
    })
}

/// Validate only the supplied fields of an update request. Fields the kind
/// does not know are ignored. Paired subtypes are checked individually.
pub fn validate_patch(
    kind: &KindDescriptor,
    body: &Map<String, Value>,
) -> AppResult<ObservationPatch> {
    let mut check = Checker::new(body);
    let mut patch = ObservationPatch::default();

    for field in kind.subtypes {
        if check.supplied(field.name) {
            if let Some(value) = check.subtype(field) {
                patch.subtype.push((field, value));
            }
        }
    }

    if check.supplied("photo") {
        patch.photo = check.required_text("photo", "Photo");
    }
    if check.supplied("date") {
        patch.date = check.date();
    }
    if check.supplied("timeOfDay") {
        patch.time_of_day = check.time_of_day();
    }
    patch.description = check.optional_text("description", "Description");
    patch.location = check.location();
    if kind.accepts_names {
        patch.common_name = check.optional_text("commonName", "Common name");
        patch.scientific_name = check.optional_text("scientificName", "Scientific name");
    }

    check.finish(|| Some(patch))
}
