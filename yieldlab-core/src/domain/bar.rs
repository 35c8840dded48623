//! DayBar: one adjusted daily bar for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Adjusted OHLC bar for a single instrument on a single trading day.
///
/// Prices are assumed to be already adjusted for corporate actions.
/// A price read as null from the source is stored as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl DayBar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// A flat bar traded at a single price all day (high == low).
    pub fn is_flat(&self) -> bool {
        !self.high.is_nan() && self.high == self.low
    }
}
