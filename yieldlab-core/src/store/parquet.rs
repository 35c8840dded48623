//! Parquet partition store with Hive-style layout.
//!
//! Layout: `{root}/tier={TIER}/year={YEAR}/part-{STAMP}-{DIGEST}.parquet`
//!
//! - Each append writes one new part file; earlier parts are never touched
//! - Atomic writes (write to .tmp, rename into place)
//! - The digest covers the batch's content hashes, so re-sending an identical
//!   batch within one run replaces its own part instead of duplicating it

use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{check_partition, PartitionKey, PartitionedStore, StoreError, WriteReceipt};
use crate::domain::{ContentHash, ForwardReturnRecord, IngestStamp};
use crate::limit::LimitStatus;

/// Year-partitioned Parquet output tree.
pub struct ParquetPartitionStore {
    root: PathBuf,
}

impl ParquetPartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a partition: `{root}/tier={TIER}/year={YEAR}/`
    pub fn partition_dir(&self, key: &PartitionKey) -> PathBuf {
        self.root
            .join(format!("tier={}", key.tier))
            .join(format!("year={}", key.year))
    }

    /// Part files of a partition, sorted by name (stamp order).
    pub fn part_files(&self, key: &PartitionKey) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.partition_dir(key);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load every record written to a partition, across all part files.
    ///
    /// Unreadable part files are logged and skipped.
    pub fn read_partition(
        &self,
        key: &PartitionKey,
    ) -> Result<Vec<ForwardReturnRecord>, StoreError> {
        let mut records = Vec::new();
        for path in self.part_files(key)? {
            match read_part(&path) {
                Ok(part) => records.extend(part),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable part file"),
            }
        }
        Ok(records)
    }

    /// Tiers and years present under the root.
    pub fn partitions(&self) -> Result<Vec<PartitionKey>, StoreError> {
        let mut keys = Vec::new();
        if !self.root.is_dir() {
            return Ok(keys);
        }
        for tier_entry in fs::read_dir(&self.root)? {
            let tier_entry = tier_entry?;
            let tier_name = tier_entry.file_name().to_string_lossy().to_string();
            let Some(tier) = tier_name.strip_prefix("tier=") else {
                continue;
            };
            for year_entry in fs::read_dir(tier_entry.path())? {
                let year_name = year_entry?.file_name().to_string_lossy().to_string();
                if let Some(year) = year_name
                    .strip_prefix("year=")
                    .and_then(|y| y.parse::<i32>().ok())
                {
                    keys.push(PartitionKey::new(tier, year));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl PartitionedStore for ParquetPartitionStore {
    fn name(&self) -> &str {
        "parquet"
    }

    fn append(
        &self,
        key: &PartitionKey,
        records: &[ForwardReturnRecord],
    ) -> Result<WriteReceipt, StoreError> {
        check_partition(key, records)?;
        let dir = self.partition_dir(key);
        if records.is_empty() {
            return Ok(WriteReceipt {
                key: key.clone(),
                rows: 0,
                location: dir.display().to_string(),
            });
        }

        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", dir.display())))?;

        let path = dir.join(part_file_name(records));
        let tmp_path = path.with_extension("parquet.tmp");

        let mut df = records_to_dataframe(records)?;
        write_atomically(&tmp_path, &path, |tmp| write_parquet(&mut df, tmp))?;

        debug!(path = %path.display(), rows = records.len(), "wrote part file");
        Ok(WriteReceipt {
            key: key.clone(),
            rows: records.len(),
            location: path.display().to_string(),
        })
    }
}

/// `part-{stamp}-{digest}.parquet`, digest over the batch's content hashes.
fn part_file_name(records: &[ForwardReturnRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for r in records {
        hasher.update(r.content_hash.as_str().as_bytes());
    }
    let digest = hasher.finalize().to_hex().to_string();
    let stamp = records
        .first()
        .map(|r| r.ingested_at.file_tag())
        .unwrap_or_default();
    format!("part-{stamp}-{}.parquet", &digest[..12])
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Convert records to a Polars DataFrame.
fn records_to_dataframe(records: &[ForwardReturnRecord]) -> Result<DataFrame, StoreError> {
    let err = |what: &str, e: PolarsError| StoreError::ParquetError(format!("{what}: {e}"));

    let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
    let flags: Vec<i32> = records
        .iter()
        .map(|r| i32::from(r.limit_status.flag()))
        .collect();
    let horizons: Vec<Series> = records
        .iter()
        .map(|r| Series::new("".into(), r.horizons.as_slice()))
        .collect();
    let returns: Vec<Series> = records
        .iter()
        .map(|r| Series::new("".into(), r.returns.as_slice()))
        .collect();
    let hashes: Vec<&str> = records.iter().map(|r| r.content_hash.as_str()).collect();
    let stamps: Vec<i64> = records.iter().map(|r| r.ingested_at.millis()).collect();

    DataFrame::new(vec![
        Column::new("code".into(), codes),
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| err("date cast", e))?,
        Column::new("close".into(), closes),
        Column::new("limit_status".into(), flags),
        Column::from(Series::new("horizons".into(), horizons)),
        Column::from(Series::new("returns".into(), returns)),
        Column::new("content_hash".into(), hashes),
        Column::new("ingested_at".into(), stamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| err("ingested_at cast", e))?,
    ])
    .map_err(|e| err("dataframe creation", e))
}

/// Write through `tmp_path`, then rename it onto `path`. The temp file is
/// removed if either step fails.
fn write_atomically(
    tmp_path: &Path,
    path: &Path,
    write: impl FnOnce(&Path) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    if let Err(e) = write(tmp_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(e);
    }
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        StoreError::Unavailable(format!("atomic rename failed: {e}"))
    })
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), StoreError> {
    let file = fs::File::create(path)
        .map_err(|e| StoreError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| StoreError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load one part file back into records.
fn read_part(path: &Path) -> Result<Vec<ForwardReturnRecord>, StoreError> {
    let perr = |what: &str, e: PolarsError| StoreError::ParquetError(format!("{what}: {e}"));

    let file = fs::File::open(path).map_err(|e| StoreError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| perr("read", e))?;

    let codes = df.column("code").map_err(|e| perr("code", e))?;
    let code_ca = codes.str().map_err(|e| perr("code type", e))?;
    let dates = df.column("date").map_err(|e| perr("date", e))?;
    let date_ca = dates.date().map_err(|e| perr("date type", e))?;
    let closes = df.column("close").map_err(|e| perr("close", e))?;
    let close_ca = closes.f64().map_err(|e| perr("close type", e))?;
    let flags = df
        .column("limit_status")
        .map_err(|e| perr("limit_status", e))?
        .cast(&DataType::Int32)
        .map_err(|e| perr("limit_status cast", e))?;
    let flag_ca = flags.i32().map_err(|e| perr("limit_status type", e))?;
    let horizons = df.column("horizons").map_err(|e| perr("horizons", e))?;
    let horizon_ca = horizons.list().map_err(|e| perr("horizons type", e))?;
    let returns = df.column("returns").map_err(|e| perr("returns", e))?;
    let return_ca = returns.list().map_err(|e| perr("returns type", e))?;
    let hashes = df.column("content_hash").map_err(|e| perr("content_hash", e))?;
    let hash_ca = hashes.str().map_err(|e| perr("content_hash type", e))?;
    let stamps = df
        .column("ingested_at")
        .map_err(|e| perr("ingested_at", e))?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| perr("ingested_at cast", e))?;
    let stamp_ca = stamps.datetime().map_err(|e| perr("ingested_at type", e))?;

    let missing =
        |what: &str, i: usize| StoreError::ParquetError(format!("null {what} at row {i}"));

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let code = code_ca.get(i).ok_or_else(|| missing("code", i))?;
        let days = date_ca.get(i).ok_or_else(|| missing("date", i))?;
        let flag = flag_ca.get(i).ok_or_else(|| missing("limit_status", i))?;
        let limit_status = i8::try_from(flag)
            .ok()
            .and_then(LimitStatus::from_flag)
            .ok_or_else(|| StoreError::ParquetError(format!("bad limit flag {flag} at row {i}")))?;
        let horizon_series = horizon_ca.get_as_series(i).ok_or_else(|| missing("horizons", i))?;
        let horizon_series = horizon_series
            .cast(&DataType::UInt32)
            .map_err(|e| perr("horizons cast", e))?;
        let return_series = return_ca.get_as_series(i).ok_or_else(|| missing("returns", i))?;
        let hash = hash_ca.get(i).ok_or_else(|| missing("content_hash", i))?;
        let ms = stamp_ca.get(i).ok_or_else(|| missing("ingested_at", i))?;

        records.push(ForwardReturnRecord {
            code: code.to_string(),
            date: epoch() + chrono::Duration::days(days as i64),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            limit_status,
            horizons: horizon_series
                .u32()
                .map_err(|e| perr("horizons type", e))?
                .into_iter()
                .flatten()
                .collect(),
            returns: return_series
                .f64()
                .map_err(|e| perr("returns type", e))?
                .into_iter()
                .collect(),
            content_hash: ContentHash::from_hash(hash),
            ingested_at: IngestStamp::from_millis(ms)
                .ok_or_else(|| StoreError::ParquetError(format!("bad stamp {ms} at row {i}")))?,
        });
    }
    Ok(records)
}
