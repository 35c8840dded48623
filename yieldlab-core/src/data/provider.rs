//! Market-data source trait and structured error types.
//!
//! The MarketDataSource trait abstracts over where adjusted daily bars come
//! from (year-partitioned Parquet, a CSV export, synthetic data) so the
//! pipeline can swap implementations and mock them in tests.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DayBar;

/// Inclusive calendar-year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date.year())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// Errors raised while reading market data.
///
/// Any of these makes the whole (tier, year) unit fail; bad individual
/// values are not errors and surface as NaN prices instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("schema error in {path}: {source}")]
    Schema {
        path: String,
        #[source]
        source: super::schema::SchemaError,
    },

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("csv error: {0}")]
    CsvError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplier of adjusted daily bars.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// All bars dated within `years`, any order. A year with no data yields
    /// no rows rather than an error.
    fn load(&self, years: YearRange) -> Result<Vec<DayBar>, SourceError>;
}

/// Parse a source date written as `%Y-%m-%d` or `%Y%m%d`.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_contains_inclusive_bounds() {
        let r = YearRange::new(2023, 2024);
        assert!(r.contains(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()));
        assert!(r.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!r.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert_eq!(r.years().collect::<Vec<_>>(), vec![2023, 2024]);
    }
}
