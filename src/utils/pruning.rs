//! Component pruning and merging for Gaussian mixtures
//!
//! Keeps the mixture tractable between frames: truncate light components,
//! greedily merge close ones, cap the count, then renormalise so that the
//! expected target count is unchanged by pruning.

use alloc::vec::Vec;
use nalgebra::{RealField, SMatrix, SVector};

use crate::types::gaussian::{GaussianComponent, GaussianMixture};
use crate::types::spaces::{StateCovariance, StateVector};
use crate::{PhdError, Result};

/// Configuration for pruning and merging operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PruningConfig<T: RealField> {
    /// Components with weight at or below this are dropped
    pub truncation_threshold: T,
    /// Squared Mahalanobis distance within which components merge
    pub merge_threshold: T,
    /// Maximum number of components after pruning
    pub max_components: usize,
}

impl<T: RealField + Copy> PruningConfig<T> {
    /// Creates a pruning configuration.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if a threshold is negative or NaN.
    pub fn new(truncation_threshold: T, merge_threshold: T, max_components: usize) -> Result<Self> {
        if !(truncation_threshold >= T::zero()) {
            return Err(PhdError::config("truncation threshold must be non-negative"));
        }
        if !(merge_threshold >= T::zero()) {
            return Err(PhdError::config("merge threshold must be non-negative"));
        }
        Ok(Self {
            truncation_threshold,
            merge_threshold,
            max_components,
        })
    }
}

impl<T: RealField + Copy> Default for PruningConfig<T> {
    fn default() -> Self {
        Self {
            truncation_threshold: nalgebra::convert(1e-6),
            merge_threshold: nalgebra::convert(0.01),
            max_components: 100,
        }
    }
}

/// Weight sums and sizes observed at each pruning stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneReport<T> {
    /// Total weight before truncation
    pub initial_weight: T,
    /// Total weight after truncation
    pub truncated_weight: T,
    /// Total weight after merging
    pub merged_weight: T,
    /// Total weight after capping, before renormalisation
    pub capped_weight: T,
    /// Component count at each stage: input, truncated, merged, capped
    pub counts: [usize; 4],
}

/// Prunes a mixture and reports the weight sum at each stage.
///
/// 1. Truncate: drop components with weight <= `truncation_threshold`.
/// 2. Merge: repeatedly take the heaviest remaining component (first found on
///    ties) and absorb every remaining component `c` with
///    `(m_c - m_seed)' P_c^-1 (m_c - m_seed) <= merge_threshold`.
/// 3. Cap: stable sort by descending weight, keep `max_components`.
/// 4. Renormalise every weight by `initial_weight / capped_weight`.
///
/// Renormalisation is skipped when nothing survives capping.
pub fn prune<T: RealField + Copy, const N: usize>(
    mixture: &GaussianMixture<T, N>,
    config: &PruningConfig<T>,
) -> Result<(GaussianMixture<T, N>, PruneReport<T>)> {
    let initial_weight = mixture.total_weight();
    let initial_count = mixture.len();

    let mut source: Vec<GaussianComponent<T, N>> = mixture
        .iter()
        .filter(|c| c.weight() > config.truncation_threshold)
        .cloned()
        .collect();
    let truncated_weight = source.iter().fold(T::zero(), |acc, c| acc + c.weight());
    let truncated_count = source.len();

    let mut merged = Vec::with_capacity(source.len());
    while let Some(seed_index) = heaviest_index(&source) {
        let seed = source.remove(seed_index);
        let (absorbed, rest): (Vec<_>, Vec<_>) = source
            .into_iter()
            .partition(|c| c.mahalanobis_squared(seed.mean()) <= config.merge_threshold);
        source = rest;

        merged.push(merge_into_seed(&seed, &absorbed)?);
    }
    let merged_weight = merged.iter().fold(T::zero(), |acc, c| acc + c.weight());
    let merged_count = merged.len();

    // sort_by is stable
    merged.sort_by(|a, b| {
        b.weight()
            .partial_cmp(&a.weight())
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    merged.truncate(config.max_components);
    let capped_weight = merged.iter().fold(T::zero(), |acc, c| acc + c.weight());

    let report = PruneReport {
        initial_weight,
        truncated_weight,
        merged_weight,
        capped_weight,
        counts: [initial_count, truncated_count, merged_count, merged.len()],
    };
    log::debug!(
        "prune: {} -> {} -> {} -> {} components",
        report.counts[0],
        report.counts[1],
        report.counts[2],
        report.counts[3]
    );
    log::debug!(
        "prune: weight sums {} -> {} -> {} -> {}",
        initial_weight,
        truncated_weight,
        merged_weight,
        capped_weight
    );

    let pruned = if capped_weight > T::zero() {
        let norm = initial_weight / capped_weight;
        merged.iter().map(|c| c.scale_weight(norm)).collect()
    } else {
        merged
    };

    Ok((GaussianMixture::from_components(pruned), report))
}

/// Index of the heaviest component, first found on ties.
fn heaviest_index<T: RealField + Copy, const N: usize>(
    components: &[GaussianComponent<T, N>],
) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, c) in components.iter().enumerate() {
        match best {
            Some((_, w)) if !(c.weight() > w) => {}
            _ => best = Some((i, c.weight())),
        }
    }
    best.map(|(i, _)| i)
}

/// Moment-matches the seed and the absorbed components into one component.
///
/// The spread term is measured from the seed's mean, and the result keeps
/// the seed's identity.
fn merge_into_seed<T: RealField + Copy, const N: usize>(
    seed: &GaussianComponent<T, N>,
    absorbed: &[GaussianComponent<T, N>],
) -> Result<GaussianComponent<T, N>> {
    if absorbed.is_empty() {
        return Ok(seed.clone());
    }

    let members = core::iter::once(seed).chain(absorbed.iter());
    let mut weight = T::zero();
    let mut mean_acc = SVector::<T, N>::zeros();
    let mut cov_acc = SMatrix::<T, N, N>::zeros();

    for c in members {
        let d = seed.mean().as_svector() - c.mean().as_svector();
        weight += c.weight();
        mean_acc += c.mean().as_svector() * c.weight();
        cov_acc += (c.covariance().as_matrix() + d * d.transpose()) * c.weight();
    }

    GaussianComponent::new(
        weight,
        StateVector::from_svector(mean_acc / weight),
        StateCovariance::from_matrix(cov_acc / weight),
        seed.id(),
    )
}
