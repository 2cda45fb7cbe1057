//! Weighted-average primitive shared by every aggregation pass.
//!
//! Grade lists routinely contain holes: a `Score` may be a marker instead
//! of a number, and a weight may be `None` when the student was never
//! enrolled in the module. This module implements the single policy for
//! those holes. A pair contributes only when both sides are numeric; what
//! happens to the rest depends on the `force` switch.

use serde::{Deserialize, Serialize};

use crate::core::errors::{Error, Result};
use crate::core::Score;

/// Result of a weighted-average computation.
///
/// `average == None` means "no number could be produced": empty input, an
/// incomplete list under `force = false`, or a zero weight sum. The two
/// fields are always both `Some` or both `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanOutcome {
    pub average: Option<f64>,
    pub total_weight: Option<f64>,
}

impl MeanOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    fn of(average: f64, total_weight: f64) -> Self {
        Self {
            average: Some(average),
            total_weight: Some(total_weight),
        }
    }

    pub fn has_average(&self) -> bool {
        self.average.is_some()
    }
}

/// Combine parallel score/weight lists into a weighted mean.
///
/// A pair is counted only when the score is numeric and the weight is
/// present. With `force = true` every other pair is simply dropped; with
/// `force = false` a single incomplete pair makes the whole list
/// incomplete and the outcome is empty. A zero weight sum also yields the
/// empty outcome, never a division error.
pub fn weighted_mean(scores: &[Score], weights: &[Option<f64>], force: bool) -> Result<MeanOutcome> {
    if scores.len() != weights.len() {
        return Err(Error::lengths(scores.len(), weights.len()));
    }
    if scores.is_empty() {
        return Ok(MeanOutcome::empty());
    }

    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for (score, weight) in scores.iter().zip(weights.iter()) {
        match (score.value(), weight) {
            (Some(value), Some(w)) => {
                sum += value * w;
                weight_sum += w;
            }
            _ if force => continue,
            _ => return Ok(MeanOutcome::empty()),
        }
    }

    if weight_sum == 0.0 {
        return Ok(MeanOutcome::empty());
    }
    Ok(MeanOutcome::of(sum / weight_sum, weight_sum))
}

/// Weighted mean with every weight fixed at 1.0.
///
/// Used by the statistics pass, which averages the per-student tag
/// averages without any weighting. The slices are equal-length by
/// construction, so the mismatch error cannot occur.
pub fn uniform_mean(scores: &[Score], force: bool) -> MeanOutcome {
    let weights = vec![Some(1.0); scores.len()];
    weighted_mean(scores, &weights, force).unwrap_or_default()
}

/// Multiply normalized module coefficients by per-tag weights, element-wise.
///
/// A `None` coefficient stays `None`; it never collapses to zero, so a
/// module the student had no coefficient for cannot silently flatten the
/// average. Mismatched lengths are a caller bug and fail fast.
pub fn combine_tag_weights(
    coefficients: &[Option<f64>],
    tag_weights: &[f64],
) -> Result<Vec<Option<f64>>> {
    if coefficients.len() != tag_weights.len() {
        return Err(Error::lengths(coefficients.len(), tag_weights.len()));
    }
    Ok(coefficients
        .iter()
        .zip(tag_weights.iter())
        .map(|(coefficient, tag_weight)| coefficient.map(|c| c * tag_weight))
        .collect())
}
