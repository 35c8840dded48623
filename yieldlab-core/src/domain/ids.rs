use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic content hash of one forward-return record.
///
/// Covers (code, date, close, returns); never the ingestion stamp, so two runs
/// over the same input produce the same hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }

    /// Hash a record's identifying content.
    /// Uses BLAKE3 over a canonical JSON rendering so the value is stable across builds/platforms.
    pub fn compute(code: &str, date: NaiveDate, close: f64, returns: &[Option<f64>]) -> Self {
        use serde_json::json;

        // Missing returns and a NaN close both render as null
        let canonical = json!({
            "code": code,
            "date": date.to_string(),
            "close": close,
            "returns": returns,
        });

        let hash_bytes = blake3::hash(canonical.to_string().as_bytes());
        Self(hash_bytes.to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingestion timestamp, captured once per pipeline run at millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngestStamp(pub NaiveDateTime);

impl IngestStamp {
    /// Wall-clock local time, truncated to milliseconds.
    pub fn now() -> Self {
        let ms = chrono::Local::now().naive_local().and_utc().timestamp_millis();
        Self::from_millis(ms).unwrap_or_else(|| Self(chrono::Local::now().naive_local()))
    }

    pub fn from_millis(ms: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(ms).map(|dt| Self(dt.naive_utc()))
    }

    pub fn millis(&self) -> i64 {
        self.0.and_utc().timestamp_millis()
    }

    /// Human label, e.g. `2024-05-01 153012`.
    pub fn label(&self) -> String {
        self.0.format("%Y-%m-%d %H%M%S").to_string()
    }

    /// Filesystem-safe tag used in part-file names, e.g. `20240501T153012123`.
    pub fn file_tag(&self) -> String {
        self.0.format("%Y%m%dT%H%M%S%3f").to_string()
    }
}

impl fmt::Display for IngestStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_content_hash_deterministic() {
        let a = ContentHash::compute("600000", date(), 10.5, &[Some(0.01), None]);
        let b = ContentHash::compute("600000", date(), 10.5, &[Some(0.01), None]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_content_hash_sees_missing_vs_zero() {
        let missing = ContentHash::compute("600000", date(), 10.5, &[None]);
        let zero = ContentHash::compute("600000", date(), 10.5, &[Some(0.0)]);
        assert_ne!(missing, zero);
    }

    #[test]
    fn test_content_hash_changes_with_close() {
        let a = ContentHash::compute("600000", date(), 10.5, &[Some(0.01)]);
        let b = ContentHash::compute("600000", date(), 10.51, &[Some(0.01)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ingest_stamp_millis_roundtrip() {
        let stamp = IngestStamp::now();
        let back = IngestStamp::from_millis(stamp.millis()).unwrap();
        assert_eq!(stamp, back);
    }

    #[test]
    fn test_ingest_stamp_label_format() {
        let stamp = IngestStamp(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(15, 30, 12)
                .unwrap(),
        );
        assert_eq!(stamp.label(), "2024-05-01 153012");
    }
}
