//! Transition (motion) models for target dynamics
//!
//! Describes how targets evolve over one frame.

use nalgebra::RealField;
use num_traits::Float;

use crate::types::spaces::{StateCovariance, StateVector};
use crate::types::transforms::TransitionMatrix;
use crate::{PhdError, Result};

/// Trait for linear transition (motion) models.
///
/// Describes target dynamics in the form:
/// x_{k+1} = F * x_k + w
///
/// where:
/// - F is the state transition matrix
/// - w is zero-mean Gaussian process noise with covariance Q
pub trait TransitionModel<T: RealField, const N: usize> {
    /// Returns the state transition matrix.
    fn transition_matrix(&self) -> TransitionMatrix<T, N>;

    /// Returns the process noise covariance.
    fn process_noise(&self) -> StateCovariance<T, N>;

    /// Returns the probability that a target survives from one frame to the next.
    fn survival_probability(&self, state: &StateVector<T, N>) -> T;
}

pub(crate) fn check_probability<T: RealField + Copy>(value: T, name: &str) -> Result<T> {
    if value >= T::zero() && value <= T::one() {
        Ok(value)
    } else {
        Err(PhdError::config(alloc::format!(
            "{} must be in [0, 1]",
            name
        )))
    }
}

// ============================================================================
// Linear Transition
// ============================================================================

/// Arbitrary linear-Gaussian transition with a constant survival probability.
#[derive(Debug, Clone)]
pub struct LinearTransition<T: RealField, const N: usize> {
    matrix: TransitionMatrix<T, N>,
    process_noise: StateCovariance<T, N>,
    p_survival: T,
}

impl<T: RealField + Copy, const N: usize> LinearTransition<T, N> {
    /// Creates a transition model.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if `p_survival` is outside [0, 1],
    /// F has non-finite entries, or Q is not symmetric positive semi-definite.
    /// A zero Q is accepted.
    pub fn new(
        matrix: TransitionMatrix<T, N>,
        process_noise: StateCovariance<T, N>,
        p_survival: T,
    ) -> Result<Self> {
        check_probability(p_survival, "survival probability")?;
        if !matrix.is_finite() {
            return Err(PhdError::config("transition matrix has non-finite entries"));
        }
        let process_noise = process_noise.validated_semidefinite("process noise")?;

        Ok(Self {
            matrix,
            process_noise,
            p_survival,
        })
    }

    /// Creates a transition model from row-major F and Q values.
    pub fn from_row_slices(f: &[T], q: &[T], p_survival: T) -> Result<Self> {
        Self::new(
            TransitionMatrix::from_row_slice(f)?,
            StateCovariance::from_row_slice(q)?,
            p_survival,
        )
    }
}

impl<T: RealField + Copy, const N: usize> TransitionModel<T, N> for LinearTransition<T, N> {
    fn transition_matrix(&self) -> TransitionMatrix<T, N> {
        self.matrix
    }

    fn process_noise(&self) -> StateCovariance<T, N> {
        self.process_noise
    }

    fn survival_probability(&self, _state: &StateVector<T, N>) -> T {
        self.p_survival
    }
}

// ============================================================================
// Constant Velocity
// ============================================================================

/// Constant velocity model in 2D.
///
/// State: [x, y, vx, vy]
#[derive(Debug, Clone)]
pub struct ConstantVelocity2D<T: RealField> {
    /// Frame interval
    pub dt: T,
    /// Per-axis process noise variances, in state order
    pub noise: [T; 4],
    /// Survival probability
    pub p_survival: T,
}

impl<T: RealField + Float + Copy> ConstantVelocity2D<T> {
    /// Creates a constant velocity model with diagonal process noise.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if `dt` or any variance is negative,
    /// or `p_survival` is outside [0, 1].
    pub fn new(dt: T, noise: [T; 4], p_survival: T) -> Result<Self> {
        check_probability(p_survival, "survival probability")?;
        if dt < T::zero() {
            return Err(PhdError::config("time step must be non-negative"));
        }
        if noise.iter().any(|v| *v < T::zero()) {
            return Err(PhdError::config("process noise variances must be non-negative"));
        }
        Ok(Self {
            dt,
            noise,
            p_survival,
        })
    }

    fn matrix(dt: T) -> TransitionMatrix<T, 4> {
        let one = T::one();
        let zero = T::zero();

        TransitionMatrix::from_matrix(nalgebra::matrix![
            one, zero, dt, zero;
            zero, one, zero, dt;
            zero, zero, one, zero;
            zero, zero, zero, one
        ])
    }
}

impl<T: RealField + Float + Copy> TransitionModel<T, 4> for ConstantVelocity2D<T> {
    fn transition_matrix(&self) -> TransitionMatrix<T, 4> {
        Self::matrix(self.dt)
    }

    fn process_noise(&self) -> StateCovariance<T, 4> {
        StateCovariance::from_diagonal(&nalgebra::SVector::from(self.noise))
    }

    fn survival_probability(&self, _state: &StateVector<T, 4>) -> T {
        self.p_survival
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cv_transition_matrix() {
        let cv = ConstantVelocity2D::new(1.0_f64, [12.5, 50.0, 12.5, 50.0], 0.9).unwrap();
        let f = cv.transition_matrix();

        let state = StateVector::from_array([10.0, 20.0, 1.0, -2.0]);
        let predicted = f.apply_state(&state);

        assert!((predicted.index(0) - 11.0).abs() < 1e-10);
        assert!((predicted.index(1) - 18.0).abs() < 1e-10);
        assert!((cv.process_noise().as_matrix()[(1, 1)] - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_survival_probability() {
        let result = LinearTransition::<f64, 2>::new(
            TransitionMatrix::identity(),
            StateCovariance::zeros(),
            1.5,
        );
        assert!(matches!(result, Err(PhdError::Configuration { .. })));
    }

    #[test]
    fn test_zero_process_noise_accepted() {
        let model = LinearTransition::<f64, 2>::new(
            TransitionMatrix::identity(),
            StateCovariance::zeros(),
            0.9,
        )
        .unwrap();
        assert_eq!(model.survival_probability(&StateVector::zeros()), 0.9);
    }

    #[test]
    fn test_non_square_rows_rejected() {
        let result = LinearTransition::<f64, 2>::from_row_slices(&[1.0, 0.0, 1.0], &[0.0; 4], 0.9);
        assert!(matches!(result, Err(PhdError::Configuration { .. })));
    }

    #[test]
    fn test_indefinite_process_noise_rejected() {
        let result = LinearTransition::<f64, 2>::from_row_slices(
            &[1.0, 0.0, 0.0, 1.0],
            &[1.0, 0.0, 0.0, -1.0],
            0.9,
        );
        assert!(result.is_err());
    }
}
