//! Data types persisted by the storage subsystem.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Records older than this many days are dropped whenever the index is saved.
pub const RETENTION_DAYS: i64 = 10;

/// Metadata for one completed capture.
///
/// Field names on disk follow the historical `captures.json` layout so that an
/// existing index keeps loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Name of the stored artifact, e.g. `1718000000000.jpg`.
    #[serde(rename = "fileName")]
    pub artifact_name: String,
    /// Capture time, stored as epoch milliseconds.
    #[serde(rename = "timeStamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
    /// Free text shown over the image (the trigger's description).
    pub overlay: String,
    pub key: String,
}

/// Ordered collection of capture records; insertion order is capture order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureIndex {
    pub items: Vec<CaptureRecord>,
}

impl CaptureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn append(&mut self, record: CaptureRecord) {
        self.items.push(record);
    }

    /// Drops every record captured at or before the retention cutoff and
    /// returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = retention_cutoff(now);
        let before = self.items.len();
        self.items.retain(|r| r.captured_at > cutoff);
        before - self.items.len()
    }
}

pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str, captured_at: DateTime<Utc>) -> CaptureRecord {
        CaptureRecord {
            artifact_name: name.to_string(),
            captured_at,
            overlay: "Shipped!".to_string(),
            key: "ABC-1".to_string(),
        }
    }

    #[test]
    fn prune_keeps_only_records_inside_the_horizon() {
        let now = Utc::now();
        let mut index = CaptureIndex::new();
        index.append(record("old.jpg", now - Duration::days(11)));
        index.append(record("fresh.jpg", now - Duration::days(1)));

        let removed = index.prune(now);

        assert_eq!(removed, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.items[0].artifact_name, "fresh.jpg");
    }

    #[test]
    fn prune_drops_record_exactly_at_cutoff() {
        let now = Utc::now();
        let mut index = CaptureIndex::new();
        index.append(record("edge.jpg", retention_cutoff(now)));
        assert_eq!(index.prune(now), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn prune_preserves_insertion_order() {
        let now = Utc::now();
        let mut index = CaptureIndex::new();
        index.append(record("a.jpg", now - Duration::days(3)));
        index.append(record("gone.jpg", now - Duration::days(30)));
        index.append(record("b.jpg", now - Duration::days(2)));
        index.prune(now);
        let names: Vec<_> = index.items.iter().map(|r| r.artifact_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn record_uses_historical_field_names() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let json = serde_json::to_value(record("1700000000123.jpg", at)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fileName": "1700000000123.jpg",
                "timeStamp": 1_700_000_000_123i64,
                "overlay": "Shipped!",
                "key": "ABC-1",
            })
        );
    }

    #[test]
    fn index_without_items_is_not_valid() {
        assert!(serde_json::from_str::<CaptureIndex>("{}").is_err());
        assert!(serde_json::from_str::<CaptureIndex>(r#"{"items":[]}"#).is_ok());
    }
}
