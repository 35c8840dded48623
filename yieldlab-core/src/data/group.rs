//! Split a flat row set into per-instrument, date-ordered series.
//!
//! Sources deliver rows in any order and may repeat a (code, date) pair when
//! partitions overlap; the later row wins. Calendar gaps are left as they
//! are: "previous close" always means the prior row of the series.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::DayBar;

/// One instrument's bars in ascending date order, no duplicate dates.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub code: String,
    pub bars: Vec<DayBar>,
}

impl InstrumentSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of bars carrying at least one NaN price.
    pub fn void_count(&self) -> usize {
        self.bars.iter().filter(|b| b.is_void()).count()
    }
}

/// Group rows by instrument code. Output is sorted by code.
pub fn group_by_instrument(rows: Vec<DayBar>) -> Vec<InstrumentSeries> {
    let mut by_code: BTreeMap<String, BTreeMap<NaiveDate, DayBar>> = BTreeMap::new();
    for row in rows {
        by_code
            .entry(row.code.clone())
            .or_default()
            .insert(row.date, row);
    }

    by_code
        .into_iter()
        .map(|(code, dated)| InstrumentSeries {
            code,
            bars: dated.into_values().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, day: u32, close: f64) -> DayBar {
        DayBar {
            code: code.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    #[test]
    fn groups_and_sorts_by_code_then_date() {
        let rows = vec![
            row("600000", 3, 1.0),
            row("000001", 2, 2.0),
            row("600000", 2, 3.0),
        ];
        let groups = group_by_instrument(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].code, "000001");
        assert_eq!(groups[1].code, "600000");
        assert_eq!(groups[1].bars[0].close, 3.0);
        assert_eq!(groups[1].bars[1].close, 1.0);
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let rows = vec![row("600000", 2, 1.0), row("600000", 2, 5.0)];
        let groups = group_by_instrument(rows);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[0].bars[0].close, 5.0);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_by_instrument(Vec::new()).is_empty());
    }

    #[test]
    fn void_bars_are_counted() {
        let mut bad = row("600000", 3, 1.0);
        bad.open = f64::NAN;
        let groups = group_by_instrument(vec![row("600000", 2, 1.0), bad]);
        assert_eq!(groups[0].void_count(), 1);
    }
}
