//! Forward-return calculation over a horizon set.
//!
//! Every horizon at index `i` shares one buy cost: the anchor open grossed up
//! by the fee rate. Returns are rounded to four decimals. A day that was itself
//! halted limit-up returns exactly zero for every horizon; every other
//! undefined outcome is `None`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limit::{round_dp, LimitStatus};

/// Transaction cost applied to the entry price when no rate is configured.
pub const DEFAULT_FEE_RATE: f64 = 0.0005;

#[derive(Debug, Error, PartialEq)]
pub enum HorizonError {
    #[error("horizon set is empty")]
    Empty,

    #[error("horizons must be positive trading-day offsets, got {0}")]
    NonPositive(u32),
}

/// Ordered list of trading-day offsets measured from the date being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct HorizonSet(Vec<u32>);

impl HorizonSet {
    pub fn new(horizons: Vec<u32>) -> Result<Self, HorizonError> {
        if horizons.is_empty() {
            return Err(HorizonError::Empty);
        }
        if let Some(&h) = horizons.iter().find(|&&h| h == 0) {
            return Err(HorizonError::NonPositive(h));
        }
        Ok(Self(horizons))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn max(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Horizon labels as written to result tables ("1", "5", "20", ...).
    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|h| h.to_string()).collect()
    }
}

impl TryFrom<Vec<u32>> for HorizonSet {
    type Error = HorizonError;

    fn try_from(v: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<HorizonSet> for Vec<u32> {
    fn from(h: HorizonSet) -> Self {
        h.0
    }
}

/// Cost basis for one index: anchor open × (1 + fee).
///
/// `None` when the anchor is undefined or the open is zero / NaN.
pub fn buy_cost(base_open: Option<f64>, fee_rate: f64) -> Option<f64> {
    base_open
        .map(|open| open * (1.0 + fee_rate))
        .filter(|cost| !cost.is_nan() && *cost != 0.0)
}

/// Returns for every horizon at index `i`.
///
/// `closes` is the instrument's full close series; `cost` comes from
/// [`buy_cost`] for the same index.
pub fn horizon_returns(
    i: usize,
    status: LimitStatus,
    cost: Option<f64>,
    closes: &[f64],
    horizons: &HorizonSet,
) -> Vec<Option<f64>> {
    horizons
        .as_slice()
        .iter()
        .map(|&h| {
            if status.is_up() {
                return Some(0.0);
            }
            let target = i + h as usize;
            let close = *closes.get(target)?;
            let cost = cost?;
            // -0.0 from rounding is stored as 0.0
            let ret = round_dp(close / cost - 1.0, 4) + 0.0;
            (!ret.is_nan()).then_some(ret)
        })
        .collect()
}
