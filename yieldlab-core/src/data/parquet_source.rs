//! Year-partitioned Parquet market data.
//!
//! Layout: `{base_dir}/year={YEAR}/*.parquet`, each file holding at least
//! `date, code, open, high, low, close` (adjusted prices).
//!
//! - Years without a directory contribute no rows
//! - An unreadable part file fails the load; a gapped window is never scanned
//! - A readable file with the wrong columns fails the load (schema error)
//! - Rows whose date cannot be read are dropped and counted

use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::provider::{parse_date, MarketDataSource, SourceError, YearRange};
use super::schema::SourceSchema;
use crate::domain::DayBar;

/// Reader over a year-partitioned Parquet tree.
pub struct ParquetSource {
    base_dir: PathBuf,
}

impl ParquetSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Root directory of the tree.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory for one year: `{base_dir}/year={YEAR}/`
    fn year_dir(&self, year: i32) -> PathBuf {
        self.base_dir.join(format!("year={year}"))
    }

    /// Parquet part files of one year, sorted by file name.
    fn part_files(&self, year: i32) -> Result<Vec<PathBuf>, SourceError> {
        let dir = self.year_dir(year);
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
}

impl MarketDataSource for ParquetSource {
    fn name(&self) -> &str {
        "parquet"
    }

    fn load(&self, years: YearRange) -> Result<Vec<DayBar>, SourceError> {
        if !self.base_dir.is_dir() {
            return Err(SourceError::Unavailable(format!(
                "market data directory not found: {}",
                self.base_dir.display()
            )));
        }

        let mut bars = Vec::new();
        for year in years.years() {
            for path in self.part_files(year)? {
                let df = read_parquet(&path).map_err(|e| {
                    SourceError::ParquetError(format!("{}: {e}", path.display()))
                })?;
                SourceSchema::validate(&df).map_err(|source| SourceError::Schema {
                    path: path.display().to_string(),
                    source,
                })?;
                let before = bars.len();
                let dropped = append_bars(&df, years, &mut bars)?;
                if dropped > 0 {
                    warn!(path = %path.display(), dropped, "rows without a readable date dropped");
                }
                debug!(path = %path.display(), rows = bars.len() - before, "loaded part file");
            }
        }
        Ok(bars)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn read_parquet(path: &Path) -> Result<DataFrame, SourceError> {
    let file = fs::File::open(path).map_err(|e| SourceError::ParquetError(format!("open: {e}")))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| SourceError::ParquetError(format!("read: {e}")))
}

/// Convert a validated frame to bars within `years`. Returns the number of
/// rows dropped for an unreadable date or code.
fn append_bars(
    df: &DataFrame,
    years: YearRange,
    out: &mut Vec<DayBar>,
) -> Result<usize, SourceError> {
    let map_err = |e: PolarsError| SourceError::ParquetError(format!("column read: {e}"));

    let dates = date_values(df.column("date").map_err(map_err)?)?;
    let codes = df.column("code").map_err(map_err)?;
    let code_ca = codes
        .str()
        .map_err(|e| SourceError::ParquetError(format!("code column type: {e}")))?;
    let opens = price_values(df, "open")?;
    let highs = price_values(df, "high")?;
    let lows = price_values(df, "low")?;
    let closes = price_values(df, "close")?;

    let mut dropped = 0;
    for i in 0..df.height() {
        let (Some(date), Some(code)) = (dates[i], code_ca.get(i)) else {
            dropped += 1;
            continue;
        };
        if !years.contains(date) {
            continue;
        }
        out.push(DayBar {
            code: code.to_string(),
            date,
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
        });
    }
    Ok(dropped)
}

/// Price column as f64, nulls as NaN.
fn price_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, SourceError> {
    let col = df
        .column(name)
        .map_err(|e| SourceError::ParquetError(format!("column read: {e}")))?
        .cast(&DataType::Float64)
        .map_err(|e| SourceError::ParquetError(format!("{name} cast: {e}")))?;
    let ca = col
        .f64()
        .map_err(|e| SourceError::ParquetError(format!("{name} column type: {e}")))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Date column as calendar dates. Accepts Date, Datetime and `%Y-%m-%d` /
/// `%Y%m%d` strings.
fn date_values(col: &Column) -> Result<Vec<Option<NaiveDate>>, SourceError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| SourceError::ParquetError("epoch date".into()))?;

    match col.dtype() {
        DataType::String => {
            let ca = col
                .str()
                .map_err(|e| SourceError::ParquetError(format!("date column type: {e}")))?;
            Ok(ca
                .into_iter()
                .map(|v| v.and_then(parse_date))
                .collect())
        }
        _ => {
            let as_date = col
                .cast(&DataType::Date)
                .map_err(|e| SourceError::ParquetError(format!("date cast: {e}")))?;
            let ca = as_date
                .date()
                .map_err(|e| SourceError::ParquetError(format!("date column type: {e}")))?;
            Ok((0..ca.len())
                .map(|i| ca.get(i).map(|days| epoch + chrono::Duration::days(days as i64)))
                .collect())
        }
    }
}
