//! In-process store, one `Vec` of batches per partition.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{check_partition, PartitionKey, PartitionedStore, StoreError, WriteReceipt};
use crate::domain::ForwardReturnRecord;

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: Mutex<BTreeMap<PartitionKey, Vec<Vec<ForwardReturnRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record appended to `key`, in write order.
    pub fn records(&self, key: &PartitionKey) -> Vec<ForwardReturnRecord> {
        self.lock()
            .get(key)
            .map(|batches| batches.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of appends received by `key`.
    pub fn batch_count(&self, key: &PartitionKey) -> usize {
        self.lock().get(key).map_or(0, |b| b.len())
    }

    pub fn keys(&self) -> Vec<PartitionKey> {
        self.lock().keys().cloned().collect()
    }

    pub fn total_rows(&self) -> usize {
        self.lock().values().flatten().map(|b| b.len()).sum()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<PartitionKey, Vec<Vec<ForwardReturnRecord>>>> {
        // A poisoned lock still holds consistent data: appends are single pushes
        self.partitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartitionedStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn append(
        &self,
        key: &PartitionKey,
        records: &[ForwardReturnRecord],
    ) -> Result<WriteReceipt, StoreError> {
        check_partition(key, records)?;
        if !records.is_empty() {
            self.lock()
                .entry(key.clone())
                .or_default()
                .push(records.to_vec());
        }
        Ok(WriteReceipt {
            key: key.clone(),
            rows: records.len(),
            location: format!("memory://{key}"),
        })
    }
}
