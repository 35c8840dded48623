//! Result assembly: scan every instrument of a source window and emit the
//! records dated in the target year.
//!
//! Instruments are independent and are scanned in parallel with rayon. Output
//! order is deterministic (code, then date) regardless of scheduling.

use chrono::Datelike;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::InstrumentSeries;
use crate::domain::{ContentHash, ForwardReturnRecord, IngestStamp};
use crate::limit::LimitStatus;
use crate::returns::HorizonSet;
use crate::scan::{scan_instrument, ScanParams};

/// Counters describing one assembled batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Instruments with at least one bar in the target year.
    pub instruments: usize,
    pub records: usize,
    /// Missing entries across all return vectors.
    pub missing_returns: usize,
    pub up_days: usize,
    pub down_days: usize,
    /// Target-year bars carrying a NaN price.
    pub void_bars: usize,
}

impl BatchStats {
    pub fn merge(&mut self, other: &BatchStats) {
        self.instruments += other.instruments;
        self.records += other.records;
        self.missing_returns += other.missing_returns;
        self.up_days += other.up_days;
        self.down_days += other.down_days;
        self.void_bars += other.void_bars;
    }
}

/// Records for one target year plus their counters.
#[derive(Debug, Clone)]
pub struct AssembledBatch {
    pub year: i32,
    pub records: Vec<ForwardReturnRecord>,
    pub stats: BatchStats,
}

impl AssembledBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds forward-return records for one horizon tier.
///
/// The ingestion stamp is fixed at construction so every record of a run
/// carries the same value.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    horizons: HorizonSet,
    params: ScanParams,
    stamp: IngestStamp,
}

impl ResultAssembler {
    pub fn new(horizons: HorizonSet, params: ScanParams, stamp: IngestStamp) -> Self {
        Self {
            horizons,
            params,
            stamp,
        }
    }

    pub fn horizons(&self) -> &HorizonSet {
        &self.horizons
    }

    pub fn stamp(&self) -> IngestStamp {
        self.stamp
    }

    /// Scan one instrument over its whole window and keep the target year.
    pub fn assemble_instrument(&self, series: &InstrumentSeries, year: i32) -> AssembledBatch {
        let mut stats = BatchStats::default();
        if !series.bars.iter().any(|b| b.date.year() == year) {
            return AssembledBatch {
                year,
                records: Vec::new(),
                stats,
            };
        }

        let scanned = scan_instrument(&series.bars, &self.horizons, &self.params);
        let horizons = self.horizons.as_slice().to_vec();

        let records: Vec<ForwardReturnRecord> = series
            .bars
            .iter()
            .zip(scanned)
            .filter(|(bar, _)| bar.date.year() == year)
            .map(|(bar, day)| {
                match day.status {
                    LimitStatus::Up => stats.up_days += 1,
                    LimitStatus::Down => stats.down_days += 1,
                    LimitStatus::Normal => {}
                }
                if bar.is_void() {
                    stats.void_bars += 1;
                }
                let content_hash =
                    ContentHash::compute(&bar.code, bar.date, bar.close, &day.returns);
                ForwardReturnRecord {
                    code: bar.code.clone(),
                    date: bar.date,
                    close: bar.close,
                    limit_status: day.status,
                    horizons: horizons.clone(),
                    returns: day.returns,
                    content_hash,
                    ingested_at: self.stamp,
                }
            })
            .collect();

        stats.instruments = 1;
        stats.records = records.len();
        stats.missing_returns = records.iter().map(|r| r.missing_count()).sum();
        AssembledBatch {
            year,
            records,
            stats,
        }
    }

    /// Assemble every instrument of a window for `year`. Empty input yields
    /// an empty batch.
    pub fn assemble_year(&self, groups: &[InstrumentSeries], year: i32) -> AssembledBatch {
        let parts: Vec<AssembledBatch> = groups
            .par_iter()
            .map(|series| self.assemble_instrument(series, year))
            .collect();

        let mut stats = BatchStats::default();
        let mut records = Vec::with_capacity(parts.iter().map(|p| p.records.len()).sum());
        for part in parts {
            stats.merge(&part.stats);
            records.extend(part.records);
        }
        AssembledBatch {
            year,
            records,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DayBar;
    use chrono::NaiveDate;

    fn series(code: &str, start: NaiveDate, closes: &[f64]) -> InstrumentSeries {
        InstrumentSeries {
            code: code.into(),
            bars: closes
                .iter()
                .enumerate()
                .map(|(i, &c)| DayBar {
                    code: code.into(),
                    date: start + chrono::Duration::days(i as i64),
                    open: c,
                    high: c + 0.1,
                    low: c - 0.1,
                    close: c,
                })
                .collect(),
        }
    }

    fn assembler() -> ResultAssembler {
        ResultAssembler::new(
            HorizonSet::new(vec![1, 2]).unwrap(),
            ScanParams::default(),
            IngestStamp::now(),
        )
    }

    #[test]
    fn keeps_only_target_year_but_uses_next_year_for_returns() {
        let start = NaiveDate::from_ymd_opt(2023, 12, 30).unwrap();
        let s = series("600000", start, &[10.0, 10.0, 10.5, 11.0]);
        let batch = assembler().assemble_instrument(&s, 2023);

        // 2023-12-30 and 2023-12-31 only
        assert_eq!(batch.records.len(), 2);
        assert!(batch.records.iter().all(|r| r.year() == 2023));
        // Last 2023 row looks into 2024 bars for both horizons
        assert!(batch.records[1].returns.iter().all(|r| r.is_some()));
    }

    #[test]
    fn empty_input_emits_nothing() {
        let batch = assembler().assemble_year(&[], 2024);
        assert!(batch.is_empty());
        assert_eq!(batch.stats, BatchStats::default());
    }

    #[test]
    fn instrument_without_target_year_rows_is_skipped() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let s = series("600000", start, &[10.0, 10.1]);
        let batch = assembler().assemble_year(&[s], 2024);
        assert!(batch.is_empty());
        assert_eq!(batch.stats.instruments, 0);
    }

    #[test]
    fn records_share_stamp_and_carry_valid_hashes() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let groups = vec![
            series("000001", start, &[10.0, 10.1, 10.2]),
            series("600000", start, &[5.0, 5.1, 5.2]),
        ];
        let asm = assembler();
        let batch = asm.assemble_year(&groups, 2024);

        assert_eq!(batch.records.len(), 6);
        assert_eq!(batch.stats.instruments, 2);
        assert!(batch.records.iter().all(|r| r.ingested_at == asm.stamp()));
        assert!(batch.records.iter().all(|r| r.hash_matches()));
        assert_eq!(batch.records[0].code, "000001");
        assert_eq!(batch.records[3].code, "600000");
        // Per instrument: last row misses both horizons, second-to-last misses one
        assert_eq!(batch.stats.missing_returns, 2 * 3);
    }
}
