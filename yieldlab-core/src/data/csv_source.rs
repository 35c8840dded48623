//! Single-file CSV market data.
//!
//! Header: `date,code,open,high,low,close` (extra columns ignored). Empty
//! price cells become NaN; rows with an unreadable date are skipped.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::provider::{parse_date, MarketDataSource, SourceError, YearRange};
use crate::domain::DayBar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    code: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
}

/// CSV export of adjusted daily bars for many instruments.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketDataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, years: YearRange) -> Result<Vec<DayBar>, SourceError> {
        if !self.path.is_file() {
            return Err(SourceError::Unavailable(format!(
                "csv file not found: {}",
                self.path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| SourceError::CsvError(format!("open: {e}")))?;

        let mut bars = Vec::new();
        let mut skipped = 0usize;
        for record in reader.deserialize::<CsvRow>() {
            let row = record.map_err(|e| SourceError::CsvError(e.to_string()))?;
            let Some(date) = parse_date(&row.date) else {
                skipped += 1;
                continue;
            };
            if !years.contains(date) {
                continue;
            }
            bars.push(DayBar {
                code: row.code,
                date,
                open: row.open.unwrap_or(f64::NAN),
                high: row.high.unwrap_or(f64::NAN),
                low: row.low.unwrap_or(f64::NAN),
                close: row.close.unwrap_or(f64::NAN),
            });
        }

        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "rows with unreadable dates skipped");
        }
        Ok(bars)
    }
}
