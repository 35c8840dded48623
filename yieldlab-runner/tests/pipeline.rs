//! End-to-end pipeline tests over real sources and stores.
//!
//! Covers the CSV and synthetic sources, the in-memory and Parquet stores,
//! empty windows, failing units, and run-to-run hash stability.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDate;
use tempfile::TempDir;

use yieldlab_core::data::{CsvSource, MarketDataSource, ParquetSource, SourceError, YearRange};
use yieldlab_core::domain::{DayBar, ForwardReturnRecord, IngestStamp};
use yieldlab_core::store::{
    distinct_hashes, duplicate_keys, latest_by_key, MemoryStore, ParquetPartitionStore,
    PartitionKey, PartitionedStore, StoreError, WriteReceipt,
};
use yieldlab_core::limit::round_dp;
use yieldlab_core::LimitStatus;
use yieldlab_runner::{
    run_pipeline_at, PipelineConfig, RunSettings, SyntheticSource, TierConfig, UnitStatus,
    YearsConfig,
};

// ─── Shared helpers ──────────────────────────────────────────────────

fn config(start: i32, end: i32) -> PipelineConfig {
    PipelineConfig {
        years: YearsConfig {
            start,
            end,
            lookahead: 1,
        },
        tiers: vec![
            TierConfig::new("short", vec![1, 2, 3]),
            TierConfig::new("middle", vec![7, 10]),
        ],
        run: RunSettings {
            parallel: true,
            max_attempts: 2,
        },
        ..PipelineConfig::default()
    }
}

fn stamp(ms: i64) -> IngestStamp {
    IngestStamp::from_millis(ms).unwrap()
}

/// Two instruments around a year boundary, one limit-up day on 2023-12-28.
const CSV: &str = "\
date,code,open,high,low,close
2023-12-26,000001,10.00,10.20,9.90,10.00
2023-12-27,000001,10.00,10.10,9.90,10.00
2023-12-28,000001,10.44,10.44,10.44,10.44
2023-12-29,000001,10.60,10.80,10.50,10.70
2024-01-02,000001,10.70,10.90,10.60,10.80
2024-01-03,000001,10.80,11.00,10.70,10.90
2024-01-04,000001,10.90,11.10,10.80,11.00
2023-12-27,600000,5.00,5.10,4.90,5.00
2023-12-28,600000,5.00,5.10,4.90,5.05
2023-12-29,600000,5.05,5.15,4.95,5.10
2024-01-02,600000,5.10,5.20,5.00,5.15
";

fn csv_source(dir: &TempDir) -> CsvSource {
    let path = dir.path().join("bars.csv");
    std::fs::write(&path, CSV).unwrap();
    CsvSource::new(path)
}

/// Always fails for one target year, serves synthetic data otherwise.
struct PoisonedYear {
    inner: SyntheticSource,
    bad_start: i32,
    calls: AtomicU32,
}

impl MarketDataSource for PoisonedYear {
    fn name(&self) -> &str {
        "poisoned"
    }

    fn load(&self, years: YearRange) -> Result<Vec<DayBar>, SourceError> {
        if years.start == self.bad_start {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return Err(SourceError::Unavailable("disk offline".into()));
        }
        self.inner.load(years)
    }
}

/// Store that rejects every write.
struct ReadOnlyStore;

impl PartitionedStore for ReadOnlyStore {
    fn name(&self) -> &str {
        "read-only"
    }

    fn append(
        &self,
        _key: &PartitionKey,
        _records: &[ForwardReturnRecord],
    ) -> Result<WriteReceipt, StoreError> {
        Err(StoreError::Unavailable("read-only".into()))
    }
}

// ─── CSV → memory ────────────────────────────────────────────────────

#[test]
fn csv_pipeline_writes_each_tier_and_year() {
    let tmp = TempDir::new().unwrap();
    let source = csv_source(&tmp);
    let store = MemoryStore::new();

    let summary = run_pipeline_at(&config(2023, 2024), &source, &store, stamp(1_000)).unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.written(), 4);
    let short_2023 = store.records(&PartitionKey::new("short", 2023));
    // 4 + 3 rows dated 2023
    assert_eq!(short_2023.len(), 7);
    assert!(short_2023.iter().all(|r| r.ingested_at == stamp(1_000)));

    let halted = short_2023
        .iter()
        .find(|r| r.code == "000001" && r.date == NaiveDate::from_ymd_opt(2023, 12, 28).unwrap())
        .unwrap();
    assert_eq!(halted.limit_status, LimitStatus::Up);
    assert_eq!(halted.returns, vec![Some(0.0); 3]);

    // The day before the halt still buys at the halted day's open (10.44);
    // its h=3 target is 2024-01-02, read from the next year's rows
    let before = short_2023
        .iter()
        .find(|r| r.code == "000001" && r.date == NaiveDate::from_ymd_opt(2023, 12, 27).unwrap())
        .unwrap();
    let cost = 10.44 * 1.0005;
    assert_eq!(before.returns[2], Some(round_dp(10.80 / cost - 1.0, 4)));

    // 2023-12-29 anchors on the next bar, 2024-01-02 (open 10.70)
    let after = short_2023
        .iter()
        .find(|r| r.code == "000001" && r.date == NaiveDate::from_ymd_opt(2023, 12, 29).unwrap())
        .unwrap();
    let cost = 10.70 * 1.0005;
    assert_eq!(after.returns[0], Some(round_dp(10.80 / cost - 1.0, 4)));
}

#[test]
fn empty_window_is_reported_not_failed() {
    let tmp = TempDir::new().unwrap();
    let source = csv_source(&tmp);
    let store = MemoryStore::new();

    let summary = run_pipeline_at(&config(2019, 2019), &source, &store, stamp(1_000)).unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.empty(), 2);
    assert_eq!(summary.totals().records, 0);
    assert_eq!(store.total_rows(), 0);
}

#[test]
fn invalid_config_is_rejected_before_any_work() {
    let store = MemoryStore::new();
    let mut cfg = config(2024, 2024);
    cfg.tiers.clear();
    let result = run_pipeline_at(&cfg, &SyntheticSource::with_count(1), &store, stamp(0));
    assert!(result.is_err());
    assert_eq!(store.total_rows(), 0);
}

// ─── Failures ────────────────────────────────────────────────────────

#[test]
fn failing_unit_is_skipped_and_others_still_write() {
    let source = PoisonedYear {
        inner: SyntheticSource::with_count(3),
        bad_start: 2023,
        calls: AtomicU32::new(0),
    };
    let store = MemoryStore::new();

    let summary = run_pipeline_at(&config(2022, 2024), &source, &store, stamp(5_000)).unwrap();

    assert_eq!(summary.failed(), 2); // 2023 for both tiers
    assert_eq!(summary.written(), 4);
    // Two attempts for each of the two failing units
    assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    for failure in summary.failures() {
        assert_eq!(failure.year, 2023);
        assert_eq!(failure.attempts, 2);
    }
    assert!(store.records(&PartitionKey::new("short", 2023)).is_empty());
    assert!(!store.records(&PartitionKey::new("short", 2024)).is_empty());
}

#[test]
fn unavailable_store_fails_every_unit() {
    let summary = run_pipeline_at(
        &config(2024, 2024),
        &SyntheticSource::with_count(1),
        &ReadOnlyStore,
        stamp(0),
    )
    .unwrap();
    assert_eq!(summary.failed(), 2);
    assert!(summary
        .failures()
        .all(|u| matches!(&u.status, UnitStatus::Failed { error } if error.contains("read-only"))));
}

#[test]
fn unreadable_parquet_part_fails_the_unit_instead_of_writing_a_gapped_window() {
    let tmp = TempDir::new().unwrap();
    let year_dir = tmp.path().join("bars").join("year=2024");
    std::fs::create_dir_all(&year_dir).unwrap();
    std::fs::write(year_dir.join("part-0.parquet"), b"truncated").unwrap();
    let source = ParquetSource::new(tmp.path().join("bars"));
    let store = MemoryStore::new();

    let summary = run_pipeline_at(&config(2024, 2024), &source, &store, stamp(0)).unwrap();

    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.written(), 0);
    for failure in summary.failures() {
        assert_eq!(failure.attempts, 2);
        assert!(
            matches!(&failure.status, UnitStatus::Failed { error } if error.contains("part-0.parquet"))
        );
    }
    assert!(store.keys().is_empty());
}

// ─── Determinism ─────────────────────────────────────────────────────

#[test]
fn reruns_share_hashes_but_not_stamps() {
    let source = SyntheticSource::with_count(4);
    let store = MemoryStore::new();
    let cfg = config(2024, 2024);

    run_pipeline_at(&cfg, &source, &store, stamp(1_000)).unwrap();
    run_pipeline_at(&cfg, &source, &store, stamp(2_000)).unwrap();

    let key = PartitionKey::new("short", 2024);
    let all = store.records(&key);
    assert_eq!(store.batch_count(&key), 2);
    assert_eq!(duplicate_keys(&all), all.len() / 2);

    let stamps: BTreeSet<IngestStamp> = all.iter().map(|r| r.ingested_at).collect();
    assert_eq!(stamps.len(), 2);
    assert_eq!(distinct_hashes(&all).len(), all.len() / 2);

    let latest = latest_by_key(all);
    assert!(latest.iter().all(|r| r.ingested_at == stamp(2_000)));
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let source = SyntheticSource::with_count(3);
    let mut cfg = config(2023, 2024);

    let parallel = MemoryStore::new();
    run_pipeline_at(&cfg, &source, &parallel, stamp(1_000)).unwrap();

    cfg.run.parallel = false;
    let sequential = MemoryStore::new();
    run_pipeline_at(&cfg, &source, &sequential, stamp(1_000)).unwrap();

    for key in parallel.keys() {
        assert_eq!(parallel.records(&key), sequential.records(&key));
    }
}

// ─── Parquet store ───────────────────────────────────────────────────

#[test]
fn parquet_store_roundtrip_through_pipeline() {
    let tmp = TempDir::new().unwrap();
    let source = csv_source(&tmp);
    let store = ParquetPartitionStore::new(tmp.path().join("out"));

    let summary = run_pipeline_at(&config(2023, 2024), &source, &store, stamp(1_000)).unwrap();
    assert!(summary.is_success());

    let mut keys = store.partitions().unwrap();
    keys.sort();
    assert_eq!(keys.len(), 4);

    let key = PartitionKey::new("short", 2023);
    let read_back = store.read_partition(&key).unwrap();
    assert_eq!(read_back.len(), 7);
    assert!(read_back.iter().all(|r| r.hash_matches()));
    assert!(read_back.iter().any(|r| r.limit_status == LimitStatus::Up));

    // A second run with new stamps adds a part file next to the first
    run_pipeline_at(&config(2023, 2024), &source, &store, stamp(2_000)).unwrap();
    assert_eq!(store.part_files(&key).unwrap().len(), 2);
    assert_eq!(latest_by_key(store.read_partition(&key).unwrap()).len(), 7);
}
