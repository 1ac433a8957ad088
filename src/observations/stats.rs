use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::db::models::{RecentObservation, TypeCount};
use crate::observations::kind::{bucket_for, Bucket, KindDescriptor};

pub const RECENT_LIMIT: usize = 5;

/// Aggregate view of one observation collection.
///
/// Serialized with the kind's own key names (`totalObservations` vs
/// `totalActivities`, ...), so it carries its descriptor along.
#[derive(Debug, Clone)]
pub struct Stats {
    pub kind: &'static KindDescriptor,
    pub total: u64,
    pub type_stats: Vec<TypeCount>,
    pub category_stats: Option<Vec<TypeCount>>,
    pub recent: Vec<RecentObservation>,
}

impl Stats {
    pub fn new(
        kind: &'static KindDescriptor,
        total: u64,
        type_stats: Vec<TypeCount>,
        recent: Vec<RecentObservation>,
    ) -> Self {
        let category_stats = kind.buckets.map(|buckets| bucket_counts(buckets, &type_stats));
        Self {
            kind,
            total,
            type_stats,
            category_stats,
            recent,
        }
    }
}

impl Serialize for Stats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.category_stats.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.kind.total_key, &self.total)?;
        map.serialize_entry("typeStats", &self.type_stats)?;
        if let Some(category_stats) = &self.category_stats {
            map.serialize_entry("categoryStats", category_stats)?;
        }
        map.serialize_entry(self.kind.recent_key, &self.recent)?;
        map.end()
    }
}

/// Fold per-type counts into bucket counts, largest first.
pub fn bucket_counts(buckets: &[Bucket], type_stats: &[TypeCount]) -> Vec<TypeCount> {
    let mut totals: HashMap<&'static str, u64> = HashMap::new();
    for stat in type_stats {
        *totals.entry(bucket_for(buckets, &stat.value)).or_default() += stat.count;
    }

    let mut counts: Vec<TypeCount> = totals
        .into_iter()
        .map(|(name, count)| TypeCount {
            value: name.to_string(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observations::kind::Kind;

    fn count(value: &str, count: u64) -> TypeCount {
        TypeCount {
            value: value.to_string(),
            count,
        }
    }

    #[test]
    fn buckets_sum_member_counts() {
        let buckets = Kind::HumanActivity.descriptor().buckets.unwrap();
        let folded = bucket_counts(
            buckets,
            &[
                count("fire", 3),
                count("poaching", 2),
                count("mining", 1),
                count("other", 1),
            ],
        );
        assert_eq!(
            folded,
            vec![
                count("Environmental Impacts", 4),
                count("Wildlife Related", 2),
                count("Other Activities", 1),
            ]
        );
    }

    #[test]
    fn unknown_values_land_in_uncategorized() {
        let buckets = Kind::HumanActivity.descriptor().buckets.unwrap();
        let folded = bucket_counts(buckets, &[count("logging", 2)]);
        assert_eq!(folded, vec![count("Uncategorized", 2)]);
    }

    #[test]
    fn activity_stats_use_activity_keys() {
        let stats = Stats::new(
            Kind::HumanActivity.descriptor(),
            1,
            vec![count("fire", 1)],
            Vec::new(),
        );
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalActivities"], 1);
        assert_eq!(json["typeStats"][0]["_id"], "fire");
        assert_eq!(json["categoryStats"][0]["_id"], "Environmental Impacts");
        assert!(json["recentActivities"].is_array());
        assert!(json.get("totalObservations").is_none());
    }

    #[test]
    fn animal_stats_have_no_category_buckets() {
        let stats = Stats::new(Kind::Animal.descriptor(), 0, Vec::new(), Vec::new());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalObservations"], 0);
        assert!(json.get("categoryStats").is_none());
        assert!(json["recentObservations"].is_array());
    }
}
