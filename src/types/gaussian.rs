//! Gaussian components and mixtures
//!
//! A GM-PHD intensity is a weighted sum of Gaussian components. Weights are
//! not normalised: their sum is the expected number of targets.

use ::core::f64::consts::PI;
use alloc::vec::Vec;
use nalgebra::RealField;
use num_traits::Float;

use super::identity::ComponentId;
use super::spaces::{Covariance, StateCovariance, StateVector, Vector};
use crate::{PhdError, Result};

// ============================================================================
// Gaussian Component
// ============================================================================

/// A weighted Gaussian component of the PHD intensity.
///
/// The inverse covariance is cached at construction. Fields are private so
/// that the covariance can never change without the cache being rebuilt;
/// every operation that produces a new covariance goes through
/// [`GaussianComponent::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianComponent<T: RealField, const N: usize> {
    weight: T,
    mean: StateVector<T, N>,
    covariance: StateCovariance<T, N>,
    inverse_covariance: StateCovariance<T, N>,
    id: ComponentId,
}

impl<T: RealField + Copy, const N: usize> GaussianComponent<T, N> {
    /// Creates a component, computing its inverse covariance.
    ///
    /// Fails with [`PhdError::SingularMatrix`] if the covariance is not invertible.
    pub fn new(
        weight: T,
        mean: StateVector<T, N>,
        covariance: StateCovariance<T, N>,
        id: ComponentId,
    ) -> Result<Self> {
        let inverse_covariance = covariance.try_inverse().ok_or(PhdError::SingularMatrix {
            context: "component covariance",
        })?;

        Ok(Self {
            weight,
            mean,
            covariance,
            inverse_covariance,
            id,
        })
    }

    /// Weight (expected target count contributed by this component).
    #[inline]
    pub fn weight(&self) -> T {
        self.weight
    }

    /// Mean state vector.
    #[inline]
    pub fn mean(&self) -> &StateVector<T, N> {
        &self.mean
    }

    /// State covariance matrix.
    #[inline]
    pub fn covariance(&self) -> &StateCovariance<T, N> {
        &self.covariance
    }

    /// Cached inverse of the covariance.
    #[inline]
    pub fn inverse_covariance(&self) -> &StateCovariance<T, N> {
        &self.inverse_covariance
    }

    /// Internal component identity.
    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Returns a copy with the weight multiplied by `factor`.
    ///
    /// Mean, covariance (and its cached inverse) and identity are unchanged.
    #[inline]
    pub fn scale_weight(&self, factor: T) -> Self {
        Self {
            weight: self.weight * factor,
            ..self.clone()
        }
    }

    /// Returns a component with a new weight, mean and identity that shares
    /// this component's covariance and cached inverse.
    #[inline]
    pub fn with_mean(&self, weight: T, mean: StateVector<T, N>, id: ComponentId) -> Self {
        Self {
            weight,
            mean,
            id,
            ..self.clone()
        }
    }

    /// Squared Mahalanobis distance from `point` to this component's mean,
    /// measured with this component's own inverse covariance.
    pub fn mahalanobis_squared(&self, point: &StateVector<T, N>) -> T {
        let d = self.mean.as_svector() - point.as_svector();
        (d.transpose() * self.inverse_covariance.as_matrix() * d)[(0, 0)]
    }
}

// ============================================================================
// Gaussian Density
// ============================================================================

/// Evaluates the multivariate normal density 𝒩(x; mean, covariance).
///
/// p(x) = (2π)^(-M/2) |S|^(-1/2) exp(-0.5 * (x-μ)^T * S^{-1} * (x-μ))
///
/// Uses a Cholesky factorisation, so a covariance that is not positive
/// definite is reported as [`PhdError::NotPositiveDefinite`] instead of
/// silently yielding zero.
pub fn gaussian_density<T: RealField + Float + Copy, Space, const M: usize>(
    mean: &Vector<T, M, Space>,
    covariance: &Covariance<T, M, Space>,
    x: &Vector<T, M, Space>,
) -> Result<T> {
    let chol = nalgebra::Cholesky::new(*covariance.as_matrix()).ok_or(
        PhdError::NotPositiveDefinite {
            context: "density covariance",
        },
    )?;

    // det(S) = det(L)^2
    let l = chol.l();
    let mut det_l = T::one();
    for i in 0..M {
        det_l = det_l * l[(i, i)];
    }
    let det = det_l * det_l;

    if det <= T::zero() {
        return Err(PhdError::NotPositiveDefinite {
            context: "density covariance",
        });
    }

    // Solve L * y = (x - μ), then ||y||^2 = (x-μ)^T * S^{-1} * (x-μ)
    let dev = x.as_svector() - mean.as_svector();
    let y = l
        .solve_lower_triangular(&dev)
        .ok_or(PhdError::SingularMatrix {
            context: "density covariance factor",
        })?;
    let mahal_sq = y.norm_squared();

    let m = cast::<T>(M as f64);
    let two_pi = cast::<T>(2.0 * PI);
    let norm = Float::powf(two_pi, m / cast(2.0)) * Float::sqrt(det);

    Ok(Float::exp(cast::<T>(-0.5) * mahal_sq) / norm)
}

/// Converts an `f64` constant into the filter's scalar type.
#[inline]
pub(crate) fn cast<T: Float>(value: f64) -> T {
    // Lossy at worst for f32; never None for floating types.
    T::from(value).unwrap_or_else(T::nan)
}

// ============================================================================
// Gaussian Mixture
// ============================================================================

/// A Gaussian mixture representing the PHD intensity.
#[derive(Debug, Clone)]
pub struct GaussianMixture<T: RealField, const N: usize> {
    /// The Gaussian components
    pub components: Vec<GaussianComponent<T, N>>,
}

impl<T: RealField + Copy, const N: usize> GaussianMixture<T, N> {
    /// Creates an empty mixture.
    #[inline]
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Creates a mixture with the given capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: Vec::with_capacity(capacity),
        }
    }

    /// Creates a mixture from a vector of components.
    #[inline]
    pub fn from_components(components: Vec<GaussianComponent<T, N>>) -> Self {
        Self { components }
    }

    /// Returns the number of components.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the mixture is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Adds a component to the mixture.
    #[inline]
    pub fn push(&mut self, component: GaussianComponent<T, N>) {
        self.components.push(component);
    }

    /// Extends the mixture with components from an iterator.
    #[inline]
    pub fn extend<I: IntoIterator<Item = GaussianComponent<T, N>>>(&mut self, iter: I) {
        self.components.extend(iter);
    }

    /// Returns the total weight (expected number of targets).
    pub fn total_weight(&self) -> T {
        self.components
            .iter()
            .fold(T::zero(), |acc, c| acc + c.weight())
    }

    /// Iterates over the components.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &GaussianComponent<T, N>> {
        self.components.iter()
    }

    /// Consumes the mixture and returns its components.
    #[inline]
    pub fn into_components(self) -> Vec<GaussianComponent<T, N>> {
        self.components
    }
}

impl<T: RealField + Copy, const N: usize> Default for GaussianMixture<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
