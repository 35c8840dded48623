//! Version resolution over accumulated partitions.
//!
//! Partitions are append-only, so a (code, date) pair shows up once per run
//! that wrote it. These helpers pick the current version and detect change.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ContentHash, ForwardReturnRecord, RecordKey};

/// Keep the most recently ingested record per (code, date). On equal stamps
/// the later record in input order wins. Output is sorted by key.
pub fn latest_by_key(records: Vec<ForwardReturnRecord>) -> Vec<ForwardReturnRecord> {
    let mut latest: BTreeMap<RecordKey, ForwardReturnRecord> = BTreeMap::new();
    for record in records {
        let key = record.key();
        match latest.get(&key) {
            Some(existing) if existing.ingested_at > record.ingested_at => {}
            _ => {
                latest.insert(key, record);
            }
        }
    }
    latest.into_values().collect()
}

/// Number of records beyond the first for each (code, date).
pub fn duplicate_keys(records: &[ForwardReturnRecord]) -> usize {
    let unique: BTreeSet<RecordKey> = records.iter().map(|r| r.key()).collect();
    records.len() - unique.len()
}

/// Distinct content hashes present in a record set.
pub fn distinct_hashes(records: &[ForwardReturnRecord]) -> BTreeSet<ContentHash> {
    records.iter().map(|r| r.content_hash.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IngestStamp;
    use crate::limit::LimitStatus;
    use chrono::NaiveDate;

    fn record(code: &str, day: u32, ret: f64, stamp_ms: i64) -> ForwardReturnRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let returns = vec![Some(ret)];
        ForwardReturnRecord {
            code: code.into(),
            date,
            close: 10.0,
            limit_status: LimitStatus::Normal,
            horizons: vec![1],
            content_hash: ContentHash::compute(code, date, 10.0, &returns),
            returns,
            ingested_at: IngestStamp::from_millis(stamp_ms).unwrap(),
        }
    }

    #[test]
    fn latest_stamp_wins() {
        let records = vec![
            record("600000", 2, 0.02, 2_000),
            record("600000", 2, 0.01, 1_000),
            record("000001", 2, 0.03, 1_000),
        ];
        let latest = latest_by_key(records);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].code, "000001");
        assert_eq!(latest[1].returns, vec![Some(0.02)]);
    }

    #[test]
    fn duplicates_and_hashes_are_counted() {
        let records = vec![
            record("600000", 2, 0.01, 1_000),
            record("600000", 2, 0.01, 2_000),
            record("600000", 3, 0.01, 2_000),
        ];
        assert_eq!(duplicate_keys(&records), 1);
        // Same content on day 2 in both runs: one hash for it, one for day 3
        assert_eq!(distinct_hashes(&records).len(), 2);
    }
}
