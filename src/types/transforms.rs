//! Typed transformation matrices
//!
//! Matrices that transform vectors between spaces, with type-level
//! encoding of source and target spaces.

use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, Scalar};

use super::spaces::{
    Innovation, InnovationSpace, Measurement, MeasurementCovariance, MeasurementSpace,
    StateCovariance, StateSpace, StateVector,
};
use crate::{PhdError, Result};

// ============================================================================
// Transform Matrix
// ============================================================================

/// A transformation matrix that maps vectors from one space to another.
///
/// # Type Parameters
///
/// - `T`: Scalar type
/// - `ROWS`: Number of rows (dimension of target space)
/// - `COLS`: Number of columns (dimension of source space)
/// - `To`: Target space marker
/// - `From`: Source space marker
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Transform<T: Scalar, const ROWS: usize, const COLS: usize, To, From> {
    inner: SMatrix<T, ROWS, COLS>,
    _marker: PhantomData<(To, From)>,
}

impl<T: Scalar, const ROWS: usize, const COLS: usize, To, From> Transform<T, ROWS, COLS, To, From> {
    /// Creates a transform from a raw matrix.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, ROWS, COLS>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Creates a transform from `ROWS * COLS` row-major values.
    ///
    /// This is the entry point for matrices read from configuration, where the
    /// shape is only known at runtime.
    pub fn from_row_slice(data: &[T]) -> Result<Self> {
        if data.len() != ROWS * COLS {
            return Err(PhdError::config(alloc::format!(
                "expected a {}x{} matrix ({} values), got {} values",
                ROWS,
                COLS,
                ROWS * COLS,
                data.len()
            )));
        }
        Ok(Self::from_matrix(SMatrix::from_row_slice(data)))
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, ROWS, COLS> {
        &self.inner
    }
}

impl<T: Scalar + Copy, const ROWS: usize, const COLS: usize, To: Clone, From: Clone> Copy
    for Transform<T, ROWS, COLS, To, From>
where
    SMatrix<T, ROWS, COLS>: Copy,
{
}

impl<T: RealField + Copy, const ROWS: usize, const COLS: usize, To, From>
    Transform<T, ROWS, COLS, To, From>
{
    /// Returns true if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|v| v.is_finite())
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// State transition matrix: StateSpace -> StateSpace
pub type TransitionMatrix<T, const N: usize> = Transform<T, N, N, StateSpace, StateSpace>;

/// Observation matrix: StateSpace -> MeasurementSpace
pub type ObservationMatrix<T, const M: usize, const N: usize> =
    Transform<T, M, N, MeasurementSpace, StateSpace>;

/// Kalman gain: InnovationSpace -> StateSpace
pub type KalmanGain<T, const N: usize, const M: usize> =
    Transform<T, N, M, StateSpace, InnovationSpace>;

impl<T: RealField + Copy, const N: usize> TransitionMatrix<T, N> {
    /// Creates an identity transition matrix.
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    /// Applies the transition to a state vector.
    #[inline]
    pub fn apply_state(&self, state: &StateVector<T, N>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * state.as_svector())
    }

    /// Propagates a covariance matrix: F * P * F^T
    #[inline]
    pub fn propagate_covariance(&self, cov: &StateCovariance<T, N>) -> StateCovariance<T, N> {
        StateCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const M: usize, const N: usize> ObservationMatrix<T, M, N> {
    /// Applies the observation model to a state vector.
    #[inline]
    pub fn observe(&self, state: &StateVector<T, N>) -> Measurement<T, M> {
        Measurement::from_svector(self.inner * state.as_svector())
    }

    /// Projects state covariance to measurement space: H * P * H^T
    #[inline]
    pub fn project_covariance(&self, cov: &StateCovariance<T, N>) -> MeasurementCovariance<T, M> {
        MeasurementCovariance::from_matrix(self.inner * cov.as_matrix() * self.inner.transpose())
    }
}

impl<T: RealField + Copy, const N: usize, const M: usize> KalmanGain<T, N, M> {
    /// Applies the Kalman gain to an innovation vector.
    #[inline]
    pub fn correct(&self, innovation: &Innovation<T, M>) -> StateVector<T, N> {
        StateVector::from_svector(self.inner * innovation.as_svector())
    }
}

// ============================================================================
// Kalman Quantities
// ============================================================================

/// Computes the innovation covariance.
///
/// S = H * P * H^T + R
pub fn compute_innovation_covariance<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    meas_noise: &MeasurementCovariance<T, M>,
) -> MeasurementCovariance<T, M> {
    let h_p_ht = obs_matrix.project_covariance(state_cov);
    MeasurementCovariance::from_matrix(h_p_ht.as_matrix() + meas_noise.as_matrix())
}

/// Computes the Kalman gain matrix.
///
/// K = P * H^T * S^{-1}
pub fn compute_kalman_gain<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    obs_matrix: &ObservationMatrix<T, M, N>,
    innovation_cov: &MeasurementCovariance<T, M>,
) -> Result<KalmanGain<T, N, M>> {
    let s_inv = innovation_cov
        .as_matrix()
        .try_inverse()
        .ok_or(PhdError::SingularMatrix {
            context: "innovation covariance",
        })?;

    let k = state_cov.as_matrix() * obs_matrix.as_matrix().transpose() * s_inv;

    Ok(KalmanGain::from_matrix(k))
}

/// Corrected state covariance.
///
/// P_updated = (I - K*H) * P
pub fn corrected_covariance<T: RealField + Copy, const N: usize, const M: usize>(
    state_cov: &StateCovariance<T, N>,
    kalman_gain: &KalmanGain<T, N, M>,
    obs_matrix: &ObservationMatrix<T, M, N>,
) -> StateCovariance<T, N> {
    let i: SMatrix<T, N, N> = SMatrix::identity();
    let i_kh = i - kalman_gain.as_matrix() * obs_matrix.as_matrix();

    StateCovariance::from_matrix(i_kh * state_cov.as_matrix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        let dt = 1.0_f64;
        let f = TransitionMatrix::<f64, 4>::from_matrix(nalgebra::matrix![
            1.0, 0.0, dt, 0.0;
            0.0, 1.0, 0.0, dt;
            0.0, 0.0, 1.0, 0.0;
            0.0, 0.0, 0.0, 1.0
        ]);

        let state = StateVector::from_array([0.0, 0.0, 1.0, 2.0]);
        let predicted = f.apply_state(&state);

        assert!((predicted.index(0) - 1.0).abs() < 1e-10);
        assert!((predicted.index(1) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_observation_matrix() {
        let h = ObservationMatrix::<f64, 2, 4>::from_matrix(nalgebra::matrix![
            1.0, 0.0, 0.0, 0.0;
            0.0, 1.0, 0.0, 0.0
        ]);

        let state = StateVector::from_array([10.0, 20.0, 1.0, 2.0]);
        let measurement = h.observe(&state);

        assert!((measurement.index(0) - 10.0).abs() < 1e-10);
        assert!((measurement.index(1) - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_from_row_slice_shape_check() {
        assert!(ObservationMatrix::<f64, 2, 4>::from_row_slice(&[1.0; 6]).is_err());
        let h = ObservationMatrix::<f64, 2, 4>::from_row_slice(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        ])
        .unwrap();
        assert_eq!(h.as_matrix()[(1, 1)], 1.0);
        assert_eq!(h.as_matrix()[(1, 0)], 0.0);
    }

    #[test]
    fn test_scalar_kalman_quantities() {
        // P = I, H = I, R = I  =>  S = 2I, K = I/2, P+ = I/2
        let p = StateCovariance::<f64, 2>::identity();
        let h = ObservationMatrix::<f64, 2, 2>::from_matrix(nalgebra::SMatrix::identity());
        let r = MeasurementCovariance::<f64, 2>::identity();

        let s = compute_innovation_covariance(&p, &h, &r);
        assert!((s.as_matrix()[(0, 0)] - 2.0).abs() < 1e-12);

        let k = compute_kalman_gain(&p, &h, &s).unwrap();
        assert!((k.as_matrix()[(1, 1)] - 0.5).abs() < 1e-12);

        let updated = corrected_covariance(&p, &k, &h);
        assert!((updated.as_matrix()[(0, 0)] - 0.5).abs() < 1e-12);
        assert!(updated.as_matrix()[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn test_singular_innovation_covariance() {
        let p = StateCovariance::<f64, 2>::zeros();
        let h = ObservationMatrix::<f64, 2, 2>::from_matrix(nalgebra::SMatrix::identity());
        let r = MeasurementCovariance::<f64, 2>::zeros();

        let s = compute_innovation_covariance(&p, &h, &r);
        assert!(matches!(
            compute_kalman_gain(&p, &h, &s),
            Err(PhdError::SingularMatrix { .. })
        ));
    }
}
