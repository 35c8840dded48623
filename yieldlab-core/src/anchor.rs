//! Base-day (anchor) resolution.
//!
//! For a date index `i`, the anchor is the first later bar on which a buyer
//! could have entered: starting at `i + 1`, skip forward while the bar *before*
//! the candidate was halted limit-up. Resolution only ever looks at the
//! classification of days at or after `i`.

use crate::limit::LimitStatus;

/// Anchor index for start index `i`, or `None` when it runs past the series.
pub fn resolve_anchor(statuses: &[LimitStatus], i: usize) -> Option<usize> {
    let n = statuses.len();
    let mut b = i + 1;
    while b < n && statuses[b - 1].is_up() {
        b += 1;
    }
    (b < n).then_some(b)
}

/// Anchor index for every position of the series.
///
/// Single backward pass with O(1) state: a non-Up day anchors on the next
/// bar, an Up day inherits the anchor of the day after it. Agrees with
/// [`resolve_anchor`] at every index.
pub fn resolve_anchors(statuses: &[LimitStatus]) -> Vec<Option<usize>> {
    let n = statuses.len();
    let mut anchors = vec![None; n];
    // Anchor of index i + 1 while walking backwards
    let mut next: Option<usize> = None;
    for i in (0..n).rev() {
        let anchor = if i + 1 >= n {
            None
        } else if statuses[i].is_up() {
            next
        } else {
            Some(i + 1)
        };
        anchors[i] = anchor;
        next = anchor;
    }
    anchors
}

/// Open price at the anchor, or `None` if the anchor is undefined.
pub fn base_open(opens: &[f64], anchor: Option<usize>) -> Option<f64> {
    anchor.and_then(|b| opens.get(b).copied())
}
