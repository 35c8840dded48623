//! End-of-run reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

use yieldlab_core::domain::IngestStamp;
use yieldlab_core::BatchStats;

/// What happened to one (tier, year) unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Written { rows: usize, location: String },
    Empty,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub tier: String,
    pub year: i32,
    pub attempts: u32,
    pub status: UnitStatus,
    pub stats: BatchStats,
}

impl UnitReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, UnitStatus::Failed { .. })
    }
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stamp: IngestStamp,
    pub config_fingerprint: String,
    pub units: Vec<UnitReport>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Written { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.is_failed())
    }

    /// Counters summed over every unit that produced a batch.
    pub fn totals(&self) -> BatchStats {
        let mut total = BatchStats::default();
        for unit in &self.units {
            total.merge(&unit.stats);
        }
        total
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&UnitStatus) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.status)).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.totals();
        let short_fp = self.config_fingerprint.get(..12).unwrap_or(&self.config_fingerprint);
        writeln!(f, "Run {} (config {short_fp})", self.stamp.label())?;
        writeln!(
            f,
            "  units:   {} written, {} empty, {} failed",
            self.written(),
            self.empty(),
            self.failed()
        )?;
        writeln!(
            f,
            "  records: {} ({} missing returns, {} limit-up, {} limit-down, {} void bars)",
            totals.records,
            totals.missing_returns,
            totals.up_days,
            totals.down_days,
            totals.void_bars
        )?;
        for unit in self.failures() {
            if let UnitStatus::Failed { error } = &unit.status {
                writeln!(
                    f,
                    "  FAILED tier={} year={} after {} attempt(s): {error}",
                    unit.tier, unit.year, unit.attempts
                )?;
            }
        }
        Ok(())
    }
}
