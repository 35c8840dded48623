//! Per-instrument scan: classify, resolve anchors, compute returns.
//!
//! Input is one instrument's bars in ascending date order. The classifier runs
//! forward with the previous close as its only trailing state; anchors come
//! from the backward recurrence in [`crate::anchor`]; returns are then read off
//! per index.

use serde::{Deserialize, Serialize};

use crate::anchor::{base_open, resolve_anchors};
use crate::domain::DayBar;
use crate::limit::{LimitBand, LimitStatus};
use crate::returns::{buy_cost, horizon_returns, HorizonSet, DEFAULT_FEE_RATE};

/// Parameters shared by every instrument in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    pub band: LimitBand,
    pub fee_rate: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            band: LimitBand::default(),
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

/// Result for one bar of the scanned series.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedDay {
    pub status: LimitStatus,
    /// Index of the resolved base day, if any.
    pub anchor: Option<usize>,
    /// One entry per horizon, in horizon order.
    pub returns: Vec<Option<f64>>,
}

/// Classify every bar of a date-ordered series.
pub fn classify_series(bars: &[DayBar], band: &LimitBand) -> Vec<LimitStatus> {
    let mut prev_close: Option<f64> = None;
    bars.iter()
        .map(|bar| {
            let status = band.classify(bar.high, bar.low, prev_close);
            prev_close = (!bar.close.is_nan()).then_some(bar.close);
            status
        })
        .collect()
}

/// Scan one instrument. The output is index-aligned with `bars`.
pub fn scan_instrument(
    bars: &[DayBar],
    horizons: &HorizonSet,
    params: &ScanParams,
) -> Vec<ScannedDay> {
    let statuses = classify_series(bars, &params.band);
    let anchors = resolve_anchors(&statuses);
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    statuses
        .iter()
        .zip(anchors)
        .enumerate()
        .map(|(i, (&status, anchor))| {
            let cost = buy_cost(base_open(&opens, anchor), params.fee_rate);
            ScannedDay {
                status,
                anchor,
                returns: horizon_returns(i, status, cost, &closes, horizons),
            }
        })
        .collect()
}
