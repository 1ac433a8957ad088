//! Declarative descriptors for the four observation kinds.
//!
//! Every kind shares one record shape and one operation set; what differs is
//! captured here as static data and read by the validation, storage, and
//! statistics code.

use crate::db::models::ObservationType;

/// A kind-specific classification field.
#[derive(Debug, PartialEq)]
pub struct SubtypeField {
    /// Wire name in request and response bodies.
    pub name: &'static str,
    /// Column in the kind's table.
    pub column: &'static str,
    /// Human label used in validation messages.
    pub label: &'static str,
    /// Accepted values; `None` accepts any non-empty string.
    pub allowed: Option<&'static [&'static str]>,
}

impl SubtypeField {
    pub fn accepts(&self, value: &str) -> bool {
        match self.allowed {
            Some(allowed) => allowed.contains(&value),
            None => !value.trim().is_empty(),
        }
    }
}

/// Named group of subtype values reported in `categoryStats`.
pub type Bucket = (&'static str, &'static [&'static str]);

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug)]
pub struct KindDescriptor {
    pub category: &'static str,
    pub table: &'static str,
    /// Path segment under `/api`.
    pub route: &'static str,
    pub subtypes: &'static [SubtypeField],
    /// Index into `subtypes` used by the filter route and `typeStats`.
    pub filter_field: usize,
    /// Path segment of the filter route (`type` or `category`).
    pub filter_route: &'static str,
    /// Whether `commonName` / `scientificName` are accepted.
    pub accepts_names: bool,
    /// Listings drop the photo payload to keep responses small.
    pub omit_photo_in_lists: bool,
    /// When set, an empty filter result is reported as not found with this
    /// message prefix instead of returning `[]`.
    pub empty_filter: Option<&'static str>,
    pub not_found: &'static str,
    pub created: &'static str,
    pub probe: Option<&'static str>,
    pub total_key: &'static str,
    pub recent_key: &'static str,
    pub buckets: Option<&'static [Bucket]>,
    pub consent_type: ObservationType,
}

impl KindDescriptor {
    pub fn filter(&self) -> &'static SubtypeField {
        &self.subtypes[self.filter_field]
    }
}

const PLANT_CATEGORIES: &[&str] = &["Terrestrial", "Aquatic"];
const PLANT_TYPES: &[&str] = &[
    "plant",
    "epiphyte",
    "lichen",
    "bryophyte",
    "fungi",
    "other",
    "floating",
    "submerged",
];
const NATURE_TYPES: &[&str] = &["Natural events", "Aesthetics", "Other"];
const ACTIVITY_TYPES: &[&str] = &[
    "deforestation",
    "fire",
    "mining",
    "wastePollution",
    "habitatChange",
    "construction",
    "collection",
    "loudNoise",
    "poaching",
    "invasiveSpecies",
    "other",
];

const ACTIVITY_BUCKETS: &[Bucket] = &[
    (
        "Environmental Impacts",
        &["fire", "deforestation", "mining", "wastePollution"],
    ),
    ("Development Activities", &["construction", "habitatChange"]),
    ("Wildlife Related", &["poaching", "invasiveSpecies"]),
    ("Other Activities", &["collection", "loudNoise", "other"]),
];

static PLANT: KindDescriptor = KindDescriptor {
    category: "Plant",
    table: "plants",
    route: "plants",
    subtypes: &[
        SubtypeField {
            name: "plantCategory",
            column: "plant_category",
            label: "Plant category",
            allowed: Some(PLANT_CATEGORIES),
        },
        SubtypeField {
            name: "plantType",
            column: "plant_type",
            label: "Plant type",
            allowed: Some(PLANT_TYPES),
        },
    ],
    filter_field: 0,
    filter_route: "category",
    accepts_names: true,
    omit_photo_in_lists: false,
    empty_filter: Some("No plants found for category"),
    not_found: "Plant observation not found",
    created: "Plant observation created successfully",
    probe: None,
    total_key: "totalObservations",
    recent_key: "recentObservations",
    buckets: None,
    consent_type: ObservationType::Plant,
};

static ANIMAL: KindDescriptor = KindDescriptor {
    category: "Animal",
    table: "animals",
    route: "animals",
    subtypes: &[SubtypeField {
        name: "animalType",
        column: "animal_type",
        label: "Animal type",
        allowed: None,
    }],
    filter_field: 0,
    filter_route: "type",
    accepts_names: true,
    omit_photo_in_lists: false,
    empty_filter: None,
    not_found: "Animal observation not found",
    created: "Animal observation created successfully",
    probe: Some("Animal routes working!"),
    total_key: "totalObservations",
    recent_key: "recentObservations",
    buckets: None,
    consent_type: ObservationType::Animal,
};

static NATURE: KindDescriptor = KindDescriptor {
    category: "Nature",
    table: "nature",
    route: "nature",
    subtypes: &[SubtypeField {
        name: "natureType",
        column: "nature_type",
        label: "Nature type",
        allowed: Some(NATURE_TYPES),
    }],
    filter_field: 0,
    filter_route: "type",
    accepts_names: false,
    omit_photo_in_lists: false,
    empty_filter: None,
    not_found: "Nature observation not found",
    created: "Nature observation created successfully",
    probe: Some("Nature routes working!"),
    total_key: "totalObservations",
    recent_key: "recentObservations",
    buckets: None,
    consent_type: ObservationType::Nature,
};

static HUMAN_ACTIVITY: KindDescriptor = KindDescriptor {
    category: "Human Activity",
    table: "human_activities",
    route: "human-activities",
    subtypes: &[SubtypeField {
        name: "activityType",
        column: "activity_type",
        label: "Activity type",
        allowed: Some(ACTIVITY_TYPES),
    }],
    filter_field: 0,
    filter_route: "type",
    accepts_names: false,
    omit_photo_in_lists: true,
    empty_filter: None,
    not_found: "Activity not found",
    created: "Human activity observation created successfully",
    probe: Some("Human Activity routes working!"),
    total_key: "totalActivities",
    recent_key: "recentActivities",
    buckets: Some(ACTIVITY_BUCKETS),
    consent_type: ObservationType::Humanity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Plant,
    Animal,
    Nature,
    HumanActivity,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Plant, Kind::Animal, Kind::Nature, Kind::HumanActivity];

    pub fn descriptor(self) -> &'static KindDescriptor {
        match self {
            Kind::Plant => &PLANT,
            Kind::Animal => &ANIMAL,
            Kind::Nature => &NATURE,
            Kind::HumanActivity => &HUMAN_ACTIVITY,
        }
    }
}

/// Bucket a subtype value falls into, or [`UNCATEGORIZED`].
pub fn bucket_for(buckets: &[Bucket], value: &str) -> &'static str {
    buckets
        .iter()
        .find(|(_, members)| members.contains(&value))
        .map(|(name, _)| *name)
        .unwrap_or(UNCATEGORIZED)
}
