//! Observation (sensor) models
//!
//! Describes how point observations relate to target states.

use nalgebra::RealField;
use num_traits::Float;

use super::transition::check_probability;
use crate::types::spaces::{MeasurementCovariance, StateVector};
use crate::types::transforms::ObservationMatrix;
use crate::{PhdError, Result};

/// Trait for linear observation models.
///
/// Describes the measurement process:
/// z = H * x + v
///
/// where:
/// - H is the observation matrix
/// - v is zero-mean Gaussian measurement noise with covariance R
pub trait ObservationModel<T: RealField, const N: usize, const M: usize> {
    /// Returns the observation matrix.
    fn observation_matrix(&self) -> ObservationMatrix<T, M, N>;

    /// Returns the measurement noise covariance.
    fn measurement_noise(&self) -> MeasurementCovariance<T, M>;

    /// Returns the probability of detection for a target at the given state.
    fn detection_probability(&self, state: &StateVector<T, N>) -> T;
}

// ============================================================================
// Linear Observation
// ============================================================================

/// Arbitrary linear-Gaussian observation with a constant detection probability.
#[derive(Debug, Clone)]
pub struct LinearObservation<T: RealField, const N: usize, const M: usize> {
    matrix: ObservationMatrix<T, M, N>,
    noise: MeasurementCovariance<T, M>,
    p_detection: T,
}

impl<T: RealField + Copy, const N: usize, const M: usize> LinearObservation<T, N, M> {
    /// Creates an observation model.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if `p_detection` is outside [0, 1],
    /// H has non-finite entries, or R is not symmetric positive definite.
    pub fn new(
        matrix: ObservationMatrix<T, M, N>,
        noise: MeasurementCovariance<T, M>,
        p_detection: T,
    ) -> Result<Self> {
        check_probability(p_detection, "detection probability")?;
        if !matrix.is_finite() {
            return Err(PhdError::config("observation matrix has non-finite entries"));
        }
        let noise = noise.validated("observation noise")?;

        Ok(Self {
            matrix,
            noise,
            p_detection,
        })
    }

    /// Creates an observation model from row-major H and R values.
    pub fn from_row_slices(h: &[T], r: &[T], p_detection: T) -> Result<Self> {
        Self::new(
            ObservationMatrix::from_row_slice(h)?,
            MeasurementCovariance::from_row_slice(r)?,
            p_detection,
        )
    }
}

impl<T: RealField + Copy, const N: usize, const M: usize> ObservationModel<T, N, M>
    for LinearObservation<T, N, M>
{
    fn observation_matrix(&self) -> ObservationMatrix<T, M, N> {
        self.matrix
    }

    fn measurement_noise(&self) -> MeasurementCovariance<T, M> {
        self.noise
    }

    fn detection_probability(&self, _state: &StateVector<T, N>) -> T {
        self.p_detection
    }
}

// ============================================================================
// Position Sensor
// ============================================================================

/// Position-only sensor in 2D.
///
/// Observes [x, y] from state [x, y, vx, vy]
#[derive(Debug, Clone)]
pub struct PositionSensor2D<T: RealField> {
    /// X position noise standard deviation
    pub sigma_x: T,
    /// Y position noise standard deviation
    pub sigma_y: T,
    /// Detection probability
    pub p_detection: T,
}

impl<T: RealField + Float + Copy> PositionSensor2D<T> {
    /// Creates a new position sensor.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if a noise std is not positive or
    /// `p_detection` is outside [0, 1].
    pub fn new(sigma_x: T, sigma_y: T, p_detection: T) -> Result<Self> {
        check_probability(p_detection, "detection probability")?;
        if sigma_x <= T::zero() || sigma_y <= T::zero() {
            return Err(PhdError::config("measurement noise std must be positive"));
        }
        Ok(Self {
            sigma_x,
            sigma_y,
            p_detection,
        })
    }
}

impl<T: RealField + Float + Copy> ObservationModel<T, 4, 2> for PositionSensor2D<T> {
    fn observation_matrix(&self) -> ObservationMatrix<T, 2, 4> {
        let one = T::one();
        let zero = T::zero();

        ObservationMatrix::from_matrix(nalgebra::matrix![
            one, zero, zero, zero;
            zero, one, zero, zero
        ])
    }

    fn measurement_noise(&self) -> MeasurementCovariance<T, 2> {
        let zero = T::zero();

        MeasurementCovariance::from_matrix(nalgebra::matrix![
            self.sigma_x * self.sigma_x, zero;
            zero, self.sigma_y * self.sigma_y
        ])
    }

    fn detection_probability(&self, _state: &StateVector<T, 4>) -> T {
        self.p_detection
    }
}
