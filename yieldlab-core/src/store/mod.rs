//! Partitioned result storage.
//!
//! A store receives batches of forward-return records tagged with a
//! partition key (tier, calendar year) and appends them. Writing the same
//! partition twice accumulates rows; consumers use the content hash and the
//! ingestion stamp to pick the current version of each (code, date).

pub mod dedup;
pub mod memory;
pub mod parquet;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::ForwardReturnRecord;

pub use dedup::{distinct_hashes, duplicate_keys, latest_by_key};
pub use memory::MemoryStore;
pub use parquet::ParquetPartitionStore;

/// Where a batch lands: one horizon tier, one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub tier: String,
    pub year: i32,
}

impl PartitionKey {
    pub fn new(tier: impl Into<String>, year: i32) -> Self {
        Self {
            tier: tier.into(),
            year,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier={}/year={}", self.tier, self.year)
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub key: PartitionKey,
    pub rows: usize,
    /// Store-specific location of the written part (file path, etc).
    pub location: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("record for {date} dated outside partition {key}")]
    WrongPartition {
        key: PartitionKey,
        date: chrono::NaiveDate,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sink for assembled forward-return batches.
pub trait PartitionedStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    /// Append a batch to a partition. An empty batch writes nothing.
    fn append(
        &self,
        key: &PartitionKey,
        records: &[ForwardReturnRecord],
    ) -> Result<WriteReceipt, StoreError>;
}

/// Reject records whose date does not fall in the partition's year.
pub(crate) fn check_partition(
    key: &PartitionKey,
    records: &[ForwardReturnRecord],
) -> Result<(), StoreError> {
    match records.iter().find(|r| r.year() != key.year) {
        Some(r) => Err(StoreError::WrongPartition {
            key: key.clone(),
            date: r.date,
        }),
        None => Ok(()),
    }
}
