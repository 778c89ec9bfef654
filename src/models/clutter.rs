//! Clutter models for false alarms
//!
//! The corrector only needs the clutter intensity κ(z) at each observation:
//! the expected density of false positives there.

use nalgebra::RealField;

use crate::types::spaces::Measurement;
use crate::{PhdError, Result};

/// Trait for clutter models.
pub trait ClutterModel<T: RealField, const M: usize> {
    /// Returns the clutter intensity κ(z) at a measurement.
    fn clutter_intensity(&self, measurement: &Measurement<T, M>) -> T;
}

/// Spatially constant clutter intensity.
#[derive(Debug, Clone)]
pub struct ConstantClutter<T: RealField> {
    intensity: T,
}

impl<T: RealField + Copy> ConstantClutter<T> {
    /// Creates a constant clutter model.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] unless `intensity > 0`.
    pub fn new(intensity: T) -> Result<Self> {
        if !(intensity > T::zero()) || !intensity.is_finite() {
            return Err(PhdError::config("clutter intensity must be positive"));
        }
        Ok(Self { intensity })
    }

    /// Uniform clutter: `rate` false alarms spread over a region of `volume`.
    pub fn uniform(rate: T, volume: T) -> Result<Self> {
        if !(volume > T::zero()) {
            return Err(PhdError::config("clutter volume must be positive"));
        }
        Self::new(rate / volume)
    }

    /// The configured intensity.
    pub fn intensity(&self) -> T {
        self.intensity
    }
}

impl<T: RealField + Copy, const M: usize> ClutterModel<T, M> for ConstantClutter<T> {
    fn clutter_intensity(&self, _measurement: &Measurement<T, M>) -> T {
        self.intensity
    }
}
