//! ForwardReturnRecord: one scored (instrument, date) for one tier.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::ids::{ContentHash, IngestStamp};
use crate::limit::LimitStatus;

/// Assembled output row. Created once per run and never mutated; a re-run
/// supersedes it with a new stamp (and a new hash if the content moved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturnRecord {
    pub code: String,
    pub date: NaiveDate,
    /// Adjusted close on `date`.
    pub close: f64,
    pub limit_status: LimitStatus,
    pub horizons: Vec<u32>,
    /// Parallel to `horizons`; `None` marks a missing return.
    pub returns: Vec<Option<f64>>,
    pub content_hash: ContentHash,
    pub ingested_at: IngestStamp,
}

/// Natural key of a record within a tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub code: String,
    pub date: NaiveDate,
}

impl ForwardReturnRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            code: self.code.clone(),
            date: self.date,
        }
    }

    /// Calendar year of the record's date (the partition key).
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn missing_count(&self) -> usize {
        self.returns.iter().filter(|r| r.is_none()).count()
    }

    /// Recompute the content hash and compare it to the stored one.
    pub fn hash_matches(&self) -> bool {
        ContentHash::compute(&self.code, self.date, self.close, &self.returns) == self.content_hash
    }
}
