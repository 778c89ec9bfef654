//! State extraction from the PHD intensity
//!
//! Turns the weighted mixture into a discrete set of target locations.

use alloc::vec::Vec;
use nalgebra::RealField;
use num_traits::Float;

use crate::tracking::BoxFootprint;
use crate::types::gaussian::{cast, GaussianComponent, GaussianMixture};
use crate::types::spaces::StateVector;
use crate::{PhdError, Result};

/// Configuration for count-based extraction and identity continuity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig<T: RealField> {
    /// Multiplier from total mixture weight to the number of targets reported.
    pub calibration: T,
    /// How a bounding box is rebuilt from an extracted location.
    pub footprint: BoxFootprint<T>,
    /// Cost of a pairing that is not allowed (different component identities).
    pub sentinel_cost: T,
}

impl<T: RealField + Float + Copy> ExtractionConfig<T> {
    /// Creates an extraction configuration.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if `calibration` is negative or
    /// `sentinel_cost` is not above the largest real cost of 1.
    pub fn new(calibration: T, footprint: BoxFootprint<T>, sentinel_cost: T) -> Result<Self> {
        if !(calibration >= T::zero()) || !Float::is_finite(calibration) {
            return Err(PhdError::config("calibration must be finite and non-negative"));
        }
        if !(sentinel_cost > T::one()) {
            return Err(PhdError::config("sentinel cost must exceed 1"));
        }
        Ok(Self {
            calibration,
            footprint,
            sentinel_cost,
        })
    }

    /// Same configuration with a different box footprint.
    pub fn with_footprint(self, footprint: BoxFootprint<T>) -> Self {
        Self { footprint, ..self }
    }
}

impl<T: RealField + Float + Copy> Default for ExtractionConfig<T> {
    fn default() -> Self {
        Self {
            calibration: cast(20000.0),
            footprint: BoxFootprint::CenterAspectHeight,
            sentinel_cost: cast(1e8),
        }
    }
}

/// Rounds to the nearest integer, ties to the even neighbour.
pub fn round_half_even<T: RealField + Float + Copy>(value: T) -> T {
    let rounded = Float::round(value);
    if Float::abs(value - Float::trunc(value)) == cast::<T>(0.5) {
        let two = cast::<T>(2.0);
        two * Float::round(value / two)
    } else {
        rounded
    }
}

/// Number of targets to report: `round(calibration * total_weight)` with
/// ties to even, capped at the mixture size.
pub fn estimate_target_count<T: RealField + Float + Copy, const N: usize>(
    mixture: &GaussianMixture<T, N>,
    calibration: T,
) -> usize {
    let expected = round_half_even(calibration * mixture.total_weight());
    if !(expected > T::zero()) {
        return 0;
    }
    expected
        .to_usize()
        .map_or(mixture.len(), |n| n.min(mixture.len()))
}

/// Repeatedly removes the heaviest remaining component until `count` are taken.
///
/// Ties go to the first component found, and a component only displaces the
/// current best if it is strictly heavier.
pub fn select_heaviest<T: RealField + Copy, const N: usize>(
    mixture: &GaussianMixture<T, N>,
    count: usize,
) -> Vec<&GaussianComponent<T, N>> {
    let mut peaks: Vec<&GaussianComponent<T, N>> = mixture.iter().collect();
    let mut selected = Vec::with_capacity(count.min(peaks.len()));

    while selected.len() < count && !peaks.is_empty() {
        let mut windex = 0;
        let mut wsize = T::zero();
        for (i, peak) in peaks.iter().enumerate() {
            if peak.weight() > wsize {
                windex = i;
                wsize = peak.weight();
            }
        }
        selected.push(peaks.remove(windex));
    }

    selected
}

/// Threshold extraction: each component with `weight * bias > 0.5`
/// contributes `round(weight * bias)` copies of its mean.
pub fn extract_by_weight<T: RealField + Float + Copy, const N: usize>(
    mixture: &GaussianMixture<T, N>,
    bias: T,
) -> Vec<StateVector<T, N>> {
    let half = cast::<T>(0.5);
    let mut items = Vec::new();
    for c in mixture.iter() {
        let value = c.weight() * bias;
        if value > half {
            let copies = round_half_even(value).to_usize().unwrap_or(0);
            items.extend(core::iter::repeat(*c.mean()).take(copies));
        }
    }
    items
}
