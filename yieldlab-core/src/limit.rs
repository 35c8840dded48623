//! Limit-status classification.
//!
//! A bar is halted when it traded at a single price all day (high == low)
//! and that price sits at or beyond a percentage band around the previous
//! close. The band multipliers are configuration: the defaults (1.044 / 0.956)
//! are narrower than the nominal 10% / 5% exchange limits, so any flat day
//! moving 4.4% or more is treated as halted.

use serde::{Deserialize, Serialize};

/// Halt classification of one instrument-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LimitStatus {
    Up,
    Down,
    #[default]
    Normal,
}

impl LimitStatus {
    /// Integer flag persisted in result tables: 1 / -1 / 0.
    pub fn flag(self) -> i8 {
        match self {
            LimitStatus::Up => 1,
            LimitStatus::Down => -1,
            LimitStatus::Normal => 0,
        }
    }

    pub fn from_flag(flag: i8) -> Option<Self> {
        match flag {
            1 => Some(LimitStatus::Up),
            -1 => Some(LimitStatus::Down),
            0 => Some(LimitStatus::Normal),
            _ => None,
        }
    }

    pub fn is_up(self) -> bool {
        self == LimitStatus::Up
    }
}

/// Multipliers applied to the previous close to find the limit prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitBand {
    pub up: f64,
    pub down: f64,
}

impl Default for LimitBand {
    fn default() -> Self {
        Self {
            up: 1.044,
            down: 0.956,
        }
    }
}

impl LimitBand {
    /// Limit-up price for a previous close, rounded to the cent.
    pub fn up_price(&self, prev_close: f64) -> f64 {
        round_dp(prev_close * self.up, 2)
    }

    /// Limit-down price for a previous close, rounded to the cent.
    pub fn down_price(&self, prev_close: f64) -> f64 {
        round_dp(prev_close * self.down, 2)
    }

    /// Classify one bar. Missing or NaN previous close always yields `Normal`.
    pub fn classify(&self, high: f64, low: f64, prev_close: Option<f64>) -> LimitStatus {
        let Some(prev) = prev_close.filter(|p| !p.is_nan()) else {
            return LimitStatus::Normal;
        };
        if high != low {
            return LimitStatus::Normal;
        }
        if high >= self.up_price(prev) {
            LimitStatus::Up
        } else if low <= self.down_price(prev) {
            LimitStatus::Down
        } else {
            LimitStatus::Normal
        }
    }
}

/// Round to `dp` decimal places using the exact decimal expansion of the value.
///
/// `(x * 10^dp).round()` drifts on values such as 1.005; formatting rounds the
/// true binary value instead, ties to even.
pub fn round_dp(x: f64, dp: usize) -> f64 {
    if !x.is_finite() {
        return x;
    }
    format!("{x:.dp$}").parse().unwrap_or(x)
}
