//! Vector space markers and typed vectors
//!
//! State vectors, observations and innovations live in different spaces and
//! cannot be mixed by accident.

use ::core::marker::PhantomData;
use ::core::ops::{Add, Mul, Neg, Sub};
use nalgebra::{RealField, SMatrix, SVector, Scalar};

use crate::{PhdError, Result};

// ============================================================================
// Vector Space Markers
// ============================================================================

/// Marker type for state space vectors (e.g., position, velocity)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace;

/// Marker type for measurement space vectors (e.g., detection centres)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementSpace;

/// Marker type for innovation vectors (measurement - predicted measurement)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnovationSpace;

// ============================================================================
// Typed Vector
// ============================================================================

/// A vector parameterized by scalar type, dimension, and mathematical space.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T: Scalar, const N: usize, Space> {
    inner: SVector<T, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a new vector from raw components.
    #[inline]
    pub fn from_array(data: [T; N]) -> Self {
        Self {
            inner: SVector::from(data),
            _marker: PhantomData,
        }
    }

    /// Creates a new vector from an nalgebra SVector.
    #[inline]
    pub fn from_svector(inner: SVector<T, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Creates a vector from a slice, checking its length.
    pub fn from_slice(data: &[T]) -> Result<Self> {
        if data.len() != N {
            return Err(PhdError::config(alloc::format!(
                "expected a vector of length {}, got {}",
                N,
                data.len()
            )));
        }
        Ok(Self::from_svector(SVector::from_column_slice(data)))
    }

    /// Returns a reference to the underlying nalgebra vector.
    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N> {
        &self.inner
    }

    /// Returns a reference to the raw data.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// Access element at index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    /// Access element at index (unchecked).
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Vector<T, N, Space> {}

impl<T: RealField + Copy, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a zero vector.
    #[inline]
    pub fn zeros() -> Self {
        Self::from_svector(SVector::zeros())
    }

    /// Scales the vector by a scalar.
    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self::from_svector(self.inner.scale(s))
    }
}

/// A state vector in state space.
pub type StateVector<T, const N: usize> = Vector<T, N, StateSpace>;

/// A measurement vector in measurement space.
pub type Measurement<T, const M: usize> = Vector<T, M, MeasurementSpace>;

/// An innovation vector (measurement residual) in innovation space.
pub type Innovation<T, const M: usize> = Vector<T, M, InnovationSpace>;

impl<T: RealField + Copy, const N: usize, Space> Add for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_svector(self.inner + rhs.inner)
    }
}

impl<T: RealField + Copy, const N: usize, Space> Sub for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_svector(self.inner - rhs.inner)
    }
}

impl<T: RealField + Copy, const N: usize, Space> Neg for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self::from_svector(-self.inner)
    }
}

impl<T: RealField + Copy, const N: usize, Space> Mul<T> for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: T) -> Self::Output {
        Self::from_svector(self.inner * rhs)
    }
}

/// Trait for computing innovation (residual) from measurements.
///
/// Subtracting two measurements produces an innovation vector, not another
/// measurement.
pub trait ComputeInnovation<T: RealField, const M: usize> {
    /// Computes the residual between this measurement and a predicted measurement.
    fn innovation(self, predicted: Measurement<T, M>) -> Innovation<T, M>;
}

impl<T: RealField + Copy, const M: usize> ComputeInnovation<T, M> for Measurement<T, M> {
    #[inline]
    fn innovation(self, predicted: Measurement<T, M>) -> Innovation<T, M> {
        Innovation::from_svector(self.inner - predicted.inner)
    }
}

// ============================================================================
// Covariance Matrix
// ============================================================================

/// A covariance matrix bound to a specific vector space.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance<T: Scalar, const N: usize, Space> {
    inner: SMatrix<T, N, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates a covariance matrix from a raw matrix.
    ///
    /// The caller should ensure the matrix is symmetric positive definite;
    /// see [`Covariance::validated`] for a checked constructor.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, N, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, N, N> {
        &self.inner
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Covariance<T, N, Space> where
    SMatrix<T, N, N>: Copy
{
}

impl<T: RealField + Copy, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates a zero covariance matrix.
    #[inline]
    pub fn zeros() -> Self {
        Self::from_matrix(SMatrix::zeros())
    }

    /// Creates an identity covariance matrix.
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    /// Creates a diagonal covariance matrix.
    #[inline]
    pub fn from_diagonal(diag: &SVector<T, N>) -> Self {
        Self::from_matrix(SMatrix::from_diagonal(diag))
    }

    /// Creates a covariance from `N * N` row-major values.
    ///
    /// Fails if the slice does not describe a square `N x N` matrix.
    pub fn from_row_slice(data: &[T]) -> Result<Self> {
        if data.len() != N * N {
            return Err(PhdError::config(alloc::format!(
                "expected {}x{} covariance ({} values), got {} values",
                N,
                N,
                N * N,
                data.len()
            )));
        }
        Ok(Self::from_matrix(SMatrix::from_row_slice(data)))
    }

    /// Checks the matrix is symmetric and positive definite.
    pub fn validated(self, context: &'static str) -> Result<Self> {
        if !self.is_symmetric() {
            return Err(PhdError::config(alloc::format!(
                "{} is not symmetric",
                context
            )));
        }
        if nalgebra::Cholesky::new(self.inner).is_none() {
            return Err(PhdError::config(alloc::format!(
                "{} is not positive definite",
                context
            )));
        }
        Ok(self)
    }

    /// Checks the matrix is symmetric and positive semi-definite.
    ///
    /// Used for process noise, where an all-zero matrix is legitimate.
    pub fn validated_semidefinite(self, context: &'static str) -> Result<Self> {
        if !self.is_symmetric() {
            return Err(PhdError::config(alloc::format!(
                "{} is not symmetric",
                context
            )));
        }
        let scale = self.inner.amax().max(T::one());
        let jitter = SMatrix::<T, N, N>::identity().scale(T::default_epsilon().sqrt() * scale);
        if nalgebra::Cholesky::new(self.inner + jitter).is_none() {
            return Err(PhdError::config(alloc::format!(
                "{} is not positive semi-definite",
                context
            )));
        }
        Ok(self)
    }

    /// Returns true if the matrix equals its transpose up to a relative tolerance.
    pub fn is_symmetric(&self) -> bool {
        let scale = self.inner.amax().max(T::one());
        let tol = T::default_epsilon().sqrt() * scale;
        (0..N).all(|i| (0..i).all(|j| (self.inner[(i, j)] - self.inner[(j, i)]).abs() <= tol))
    }

    /// Scales the covariance matrix.
    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self::from_matrix(self.inner.scale(s))
    }

    /// Adds two covariance matrices.
    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        Self::from_matrix(self.inner + other.inner)
    }

    /// Computes the trace of the covariance matrix.
    #[inline]
    pub fn trace(&self) -> T {
        self.inner.trace()
    }

    /// Computes the determinant via Cholesky decomposition.
    ///
    /// Returns `None` if the matrix is not positive definite.
    pub fn determinant(&self) -> Option<T> {
        let chol = nalgebra::Cholesky::new(self.inner)?;
        let l = chol.l();
        let mut det_l = T::one();
        for i in 0..N {
            det_l *= l[(i, i)];
        }
        Some(det_l * det_l)
    }

    /// Attempts to compute the inverse of the covariance matrix.
    #[inline]
    pub fn try_inverse(&self) -> Option<Self> {
        self.inner.try_inverse().map(Self::from_matrix)
    }
}

impl<T: RealField + Copy, const N: usize, Space> Add for Covariance<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_matrix(self.inner + rhs.inner)
    }
}

/// Covariance matrix in state space.
pub type StateCovariance<T, const N: usize> = Covariance<T, N, StateSpace>;

/// Covariance matrix in measurement space.
///
/// The innovation covariance S = H*P*H' + R is kept in measurement space too.
pub type MeasurementCovariance<T, const M: usize> = Covariance<T, M, MeasurementSpace>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_to_innovation() {
        let actual: Measurement<f64, 2> = Measurement::from_array([10.0, 20.0]);
        let predicted: Measurement<f64, 2> = Measurement::from_array([9.5, 19.0]);

        let innovation = actual.innovation(predicted);
        assert!((innovation.index(0) - 0.5).abs() < 1e-10);
        assert!((innovation.index(1) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_covariance_operations() {
        let cov: StateCovariance<f64, 2> = StateCovariance::identity();
        assert!((cov.trace() - 2.0).abs() < 1e-10);
        assert!((cov.determinant().unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_singular_covariance_determinant() {
        let singular: StateCovariance<f64, 2> =
            StateCovariance::from_matrix(nalgebra::matrix![1.0, 1.0; 1.0, 1.0]);
        assert!(singular.determinant().is_none());
        assert!(singular.try_inverse().is_none());
    }

    #[test]
    fn test_from_row_slice_rejects_wrong_size() {
        let err = StateCovariance::<f64, 2>::from_row_slice(&[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, PhdError::Configuration { .. }));

        let ok = StateCovariance::<f64, 2>::from_row_slice(&[2.0, 0.5, 0.5, 1.0]).unwrap();
        assert_eq!(ok.as_matrix()[(0, 1)], 0.5);
    }

    #[test]
    fn test_validated_rejects_asymmetric_and_indefinite() {
        let asym: MeasurementCovariance<f64, 2> =
            MeasurementCovariance::from_matrix(nalgebra::matrix![1.0, 0.3; 0.0, 1.0]);
        assert!(asym.validated("R").is_err());

        let indefinite: MeasurementCovariance<f64, 2> =
            MeasurementCovariance::from_matrix(nalgebra::matrix![1.0, 0.0; 0.0, -1.0]);
        assert!(indefinite.validated("R").is_err());

        assert!(MeasurementCovariance::<f64, 2>::identity().validated("R").is_ok());
    }

    #[test]
    fn test_vector_from_slice() {
        assert!(StateVector::<f64, 4>::from_slice(&[1.0, 2.0]).is_err());
        let v = StateVector::<f64, 2>::from_slice(&[1.0, 2.0]).unwrap();
        assert_eq!(*v.index(1), 2.0);
    }
}
