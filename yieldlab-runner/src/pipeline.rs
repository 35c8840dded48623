//! Pipeline orchestration: load, group, assemble, append, per (tier, year).
//!
//! Two entry points:
//! - `run_pipeline()`: plans every unit from a config and runs them. Used by the CLI.
//! - `run_unit()`: one attempt at one unit. Used by the retry loop and tests.
//!
//! Units share nothing but the source and the store. A unit that keeps
//! failing is reported and skipped; the others still write.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use yieldlab_core::data::{group_by_instrument, MarketDataSource, SourceError};
use yieldlab_core::domain::IngestStamp;
use yieldlab_core::store::{PartitionedStore, StoreError, WriteReceipt};
use yieldlab_core::{BatchStats, ResultAssembler, ScanParams};

use crate::config::{ConfigError, PipelineConfig};
use crate::summary::{RunSummary, UnitReport, UnitStatus};
use crate::window::{plan_units, UnitPlan};

/// Errors that fail a single unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of one successful unit attempt.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    /// `None` when the year produced no records and nothing was written.
    pub receipt: Option<WriteReceipt>,
    pub stats: BatchStats,
}

/// One attempt at one unit.
pub fn run_unit(
    unit: &UnitPlan,
    source: &dyn MarketDataSource,
    store: &dyn PartitionedStore,
    params: &ScanParams,
    stamp: IngestStamp,
) -> Result<UnitOutcome, UnitError> {
    let rows = source.load(unit.source_years)?;
    debug!(
        tier = %unit.tier,
        year = unit.year,
        source = source.name(),
        rows = rows.len(),
        "loaded source window"
    );

    let groups = group_by_instrument(rows);
    let assembler = ResultAssembler::new(unit.horizons.clone(), *params, stamp);
    let batch = assembler.assemble_year(&groups, unit.year);

    if batch.is_empty() {
        info!(tier = %unit.tier, year = unit.year, "no rows in target year, nothing written");
        return Ok(UnitOutcome {
            receipt: None,
            stats: batch.stats,
        });
    }

    let receipt = store.append(&unit.key(), &batch.records)?;
    info!(
        tier = %unit.tier,
        year = unit.year,
        rows = receipt.rows,
        missing = batch.stats.missing_returns,
        location = %receipt.location,
        "partition written"
    );
    Ok(UnitOutcome {
        receipt: Some(receipt),
        stats: batch.stats,
    })
}

/// Run a unit up to `max_attempts` times. Never fails: the last error is
/// carried in the report instead.
pub fn run_unit_with_retry(
    unit: &UnitPlan,
    source: &dyn MarketDataSource,
    store: &dyn PartitionedStore,
    params: &ScanParams,
    stamp: IngestStamp,
    max_attempts: u32,
) -> UnitReport {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match run_unit(unit, source, store, params, stamp) {
            Ok(outcome) => {
                let status = match outcome.receipt {
                    Some(receipt) => UnitStatus::Written {
                        rows: receipt.rows,
                        location: receipt.location,
                    },
                    None => UnitStatus::Empty,
                };
                return UnitReport {
                    tier: unit.tier.clone(),
                    year: unit.year,
                    attempts: attempt,
                    status,
                    stats: outcome.stats,
                };
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    tier = %unit.tier,
                    year = unit.year,
                    attempt,
                    max_attempts,
                    error = %e,
                    "unit failed, retrying"
                );
            }
            Err(e) => {
                error!(
                    tier = %unit.tier,
                    year = unit.year,
                    attempts = attempt,
                    error = %e,
                    "unit failed, skipping"
                );
                return UnitReport {
                    tier: unit.tier.clone(),
                    year: unit.year,
                    attempts: attempt,
                    status: UnitStatus::Failed {
                        error: e.to_string(),
                    },
                    stats: BatchStats::default(),
                };
            }
        }
    }
}

/// Run every (tier, year) unit of `config` with a fresh ingestion stamp.
pub fn run_pipeline(
    config: &PipelineConfig,
    source: &dyn MarketDataSource,
    store: &dyn PartitionedStore,
) -> Result<RunSummary, ConfigError> {
    run_pipeline_at(config, source, store, IngestStamp::now())
}

/// Same as [`run_pipeline`] with a caller-chosen stamp. All records of the
/// run carry `stamp`.
pub fn run_pipeline_at(
    config: &PipelineConfig,
    source: &dyn MarketDataSource,
    store: &dyn PartitionedStore,
    stamp: IngestStamp,
) -> Result<RunSummary, ConfigError> {
    config.validate()?;
    let units = plan_units(config)?;
    let params = config.scan_params();
    let max_attempts = config.run.max_attempts;

    info!(
        units = units.len(),
        source = source.name(),
        store = store.name(),
        stamp = %stamp,
        parallel = config.run.parallel,
        "pipeline starting"
    );

    let run = |unit: &UnitPlan| {
        run_unit_with_retry(unit, source, store, &params, stamp, max_attempts)
    };
    let reports: Vec<UnitReport> = if config.run.parallel {
        units.par_iter().map(run).collect()
    } else {
        units.iter().map(run).collect()
    };

    let summary = RunSummary {
        stamp,
        config_fingerprint: config.fingerprint(),
        units: reports,
    };
    info!(
        written = summary.written(),
        empty = summary.empty(),
        failed = summary.failed(),
        records = summary.totals().records,
        "pipeline finished"
    );
    Ok(summary)
}
