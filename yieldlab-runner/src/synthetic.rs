//! Deterministic synthetic market data for development and tests.
//!
//! Each code gets one continuous random walk seeded from BLAKE3 of the code
//! and started on a fixed base date. A window is a slice of that walk, so a
//! year's bars are identical no matter which window asks for them and prices
//! carry across year boundaries. The walk injects flat limit-up and
//! limit-down days so halt handling is exercised end to end.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use yieldlab_core::data::{MarketDataSource, SourceError, YearRange};
use yieldlab_core::domain::DayBar;
use yieldlab_core::limit::round_dp;

/// First year of every walk. Earlier years have no bars.
pub const BASE_YEAR: i32 = 2010;

/// Share of trading days that close flat at +10%.
const LIMIT_UP_RATE: f64 = 0.03;
/// Share of trading days that close flat at -10%.
const LIMIT_DOWN_RATE: f64 = 0.015;
/// Largest ordinary close-to-close move.
const MAX_DAILY_MOVE: f64 = 0.03;
/// Pull back toward the starting price, per unit of log distance.
const REVERSION: f64 = 0.005;

/// Random-walk source over a fixed list of instrument codes.
pub struct SyntheticSource {
    codes: Vec<String>,
}

impl SyntheticSource {
    pub fn new(codes: Vec<String>) -> Self {
        Self { codes }
    }

    /// `count` codes named `000001`, `000002`, ...
    pub fn with_count(count: usize) -> Self {
        Self::new((1..=count).map(|i| format!("{i:06}")).collect())
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, years: YearRange) -> Result<Vec<DayBar>, SourceError> {
        let mut bars = Vec::new();
        for code in &self.codes {
            bars.extend(
                generate_walk(code, years.end)
                    .into_iter()
                    .filter(|b| years.contains(b.date)),
            );
        }
        Ok(bars)
    }
}

/// Walk for `code` from `BASE_YEAR` through the end of `through`.
fn generate_walk(code: &str, through: i32) -> Vec<DayBar> {
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(BASE_YEAR, 1, 1),
        NaiveDate::from_ymd_opt(through, 12, 31),
    ) else {
        return Vec::new();
    };

    let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let anchor = round_dp(rng.gen_range(5.0..50.0), 2);
    let mut price = anchor;
    let mut current = start;

    while current <= end {
        // Skip weekends (simple heuristic)
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let roll: f64 = rng.gen();
        let bar = if roll < LIMIT_UP_RATE {
            flat_bar(code, current, round_dp(price * 1.10, 2))
        } else if roll < LIMIT_UP_RATE + LIMIT_DOWN_RATE {
            flat_bar(code, current, round_dp(price * 0.90, 2))
        } else {
            let drift = REVERSION * (anchor / price).ln();
            let daily_return = (rng.gen_range(-MAX_DAILY_MOVE..MAX_DAILY_MOVE) + drift)
                .clamp(-MAX_DAILY_MOVE, MAX_DAILY_MOVE);
            let open = round_dp(price * (1.0 + rng.gen_range(-0.005..0.005)), 2);
            let close = round_dp(price * (1.0 + daily_return), 2);
            let high = round_dp(open.max(close) * (1.0 + rng.gen_range(0.001..0.01)), 2);
            let low = round_dp(open.min(close) * (1.0 - rng.gen_range(0.001..0.01)), 2);
            DayBar {
                code: code.to_string(),
                date: current,
                open,
                high,
                low,
                close,
            }
        };

        price = bar.close.max(0.5);
        bars.push(bar);
        current += chrono::Duration::days(1);
    }

    bars
}

fn flat_bar(code: &str, date: NaiveDate, price: f64) -> DayBar {
    DayBar {
        code: code.to_string(),
        date,
        open: price,
        high: price,
        low: price,
        close: price,
    }
}
