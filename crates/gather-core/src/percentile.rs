//! Popularity score percentiles.
//!
//! The trending threshold is the 75th percentile of the scores of all
//! active events. It uses the nearest-rank method with a ceiling bias:
//! the result is always one of the input values, at zero-based rank
//! `ceil(P / 100 * (n - 1))` of the ascending sequence.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::store::EventCatalog;

/// Percentile used to mark events as trending.
pub const TRENDING_PERCENTILE: f64 = 75.0;

/// Nearest-rank percentile of `values`.
///
/// Returns `None` for an empty input. `percentile` is clamped to
/// `0..=100` (`NaN` counts as 0). The input is copied and stably sorted,
/// so ties are kept and the caller's slice is left untouched.
pub fn percentile(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    sorted.get(nearest_rank(sorted.len(), percentile)).copied()
}

/// Zero-based rank of the `percentile`th value in a sorted sequence of `len > 0`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn nearest_rank(len: usize, percentile: f64) -> usize {
    let last = len.saturating_sub(1);
    let p = if percentile.is_nan() {
        0.0
    } else {
        percentile.clamp(0.0, 100.0)
    };
    // Same operation order as `P / 100 * (n - 1)` so boundary values round identically.
    let rank = (p / 100.0 * last as f64).ceil();
    (rank as usize).min(last)
}

/// Whether a score is above the trending threshold.
///
/// Without a threshold (no active events) nothing is trending.
pub fn is_trending(score: f64, threshold: Option<f64>) -> bool {
    threshold.is_some_and(|t| score > t)
}

/// Compute the `percentile`th score over all events active at `now`.
///
/// # Errors
///
/// Returns the catalog's [`StoreError`] if the scores cannot be read.
pub async fn trending_threshold(
    catalog: &dyn EventCatalog,
    now: DateTime<Utc>,
    percentile_rank: f64,
) -> Result<Option<f64>, StoreError> {
    let scores = catalog.active_scores(now).await?;
    let threshold = percentile(&scores, percentile_rank);
    debug!(
        active_events = scores.len(),
        percentile = percentile_rank,
        ?threshold,
        "Computed trending threshold"
    );
    Ok(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_percentile() {
        assert_eq!(percentile(&[], 0.0), None);
        assert_eq!(percentile(&[], 75.0), None);
        assert_eq!(percentile(&[], 100.0), None);
    }

    #[test]
    fn seventy_fifth_of_four_values_rounds_up() {
        // rank = ceil(0.75 * 3) = 3
        assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 75.0), Some(40.0));
    }

    #[test]
    fn extremes_are_min_and_max() {
        let scores = [31.5, -2.0, 17.0, 99.25, 4.0, 17.0];
        assert_eq!(percentile(&scores, 0.0), Some(-2.0));
        assert_eq!(percentile(&scores, 100.0), Some(99.25));
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        assert_eq!(percentile(&[40.0, 10.0, 30.0, 20.0], 50.0), Some(30.0));
    }

    #[test]
    fn ties_are_kept() {
        // sorted: [5, 5, 5, 9]; rank = ceil(0.5 * 3) = 2
        assert_eq!(percentile(&[5.0, 9.0, 5.0, 5.0], 50.0), Some(5.0));
    }

    #[test]
    fn single_value_is_every_percentile() {
        for p in [0.0, 25.0, 75.0, 100.0] {
            assert_eq!(percentile(&[28.0], p), Some(28.0));
        }
    }

    #[test]
    fn out_of_range_percentiles_are_clamped() {
        let scores = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&scores, -10.0), Some(1.0));
        assert_eq!(percentile(&scores, 250.0), Some(3.0));
        assert_eq!(percentile(&scores, f64::NAN), Some(1.0));
    }

    #[test]
    fn input_is_not_mutated() {
        let scores = vec![3.0, 1.0, 2.0];
        let _ = percentile(&scores, 50.0);
        assert_eq!(scores, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn trending_is_strictly_above_threshold() {
        assert!(is_trending(41.0, Some(40.0)));
        assert!(!is_trending(40.0, Some(40.0)));
        assert!(!is_trending(1_000.0, None));
    }
}
