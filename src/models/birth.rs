//! Birth models for spontaneous target appearance
//!
//! Describes where new targets can appear. Birth components are copied into
//! the predicted mixture every frame with their identities unchanged.

use alloc::vec::Vec;
use nalgebra::RealField;
use num_traits::Float;

use crate::types::gaussian::{cast, GaussianComponent};
use crate::types::identity::ComponentId;
use crate::types::spaces::{StateCovariance, StateVector};
use crate::{PhdError, Result};

/// Trait for birth models.
pub trait BirthModel<T: RealField, const N: usize> {
    /// Returns the birth intensity as Gaussian components.
    fn birth_components(&self) -> &[GaussianComponent<T, N>];

    /// Returns the total expected number of births per frame.
    fn total_birth_mass(&self) -> T;

    /// First component identity not used by any birth component.
    ///
    /// The filter starts minting identities here so that corrected
    /// components never collide with birth identities.
    fn next_free_id(&self) -> u64
    where
        T: Copy,
    {
        self.birth_components()
            .iter()
            .map(|c| c.id().0 + 1)
            .max()
            .unwrap_or(0)
    }
}

// ============================================================================
// Fixed Birth Model
// ============================================================================

/// Birth model with fixed birth locations.
#[derive(Debug, Clone)]
pub struct FixedBirthModel<T: RealField, const N: usize> {
    components: Vec<GaussianComponent<T, N>>,
}

impl<T: RealField + Copy, const N: usize> FixedBirthModel<T, N> {
    /// Creates an empty birth model.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Creates a birth model from prepared components.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if a weight is negative or a
    /// covariance is not symmetric positive definite.
    pub fn from_components(components: Vec<GaussianComponent<T, N>>) -> Result<Self> {
        for c in &components {
            check_birth(c.weight(), c.covariance())?;
        }
        Ok(Self { components })
    }

    /// Adds a birth location and returns the identity given to it.
    ///
    /// Identities are assigned sequentially from zero in insertion order.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if `weight < 0` or the covariance
    /// is not symmetric positive definite.
    pub fn add_birth_location(
        &mut self,
        weight: T,
        mean: StateVector<T, N>,
        covariance: StateCovariance<T, N>,
    ) -> Result<ComponentId> {
        check_birth(weight, &covariance)?;
        let id = ComponentId(self.next_free_id());
        self.components
            .push(GaussianComponent::new(weight, mean, covariance, id)?);
        Ok(id)
    }

    /// Number of birth components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if no birth location has been added.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl<T: RealField + Float + Copy, const N: usize> FixedBirthModel<T, N> {
    /// Tiles a `width` x `height` region with birth components every `step`.
    ///
    /// Grid points run over `x = 0, step, ..` while `x < width`, and likewise
    /// for `y`, column by column. `place` turns a grid point into a full state mean.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if `step` is not positive, or on any
    /// error [`FixedBirthModel::add_birth_location`] would report.
    pub fn grid<F>(
        width: T,
        height: T,
        step: T,
        weight: T,
        covariance: StateCovariance<T, N>,
        place: F,
    ) -> Result<Self>
    where
        F: Fn(T, T) -> StateVector<T, N>,
    {
        if !(step > T::zero()) {
            return Err(PhdError::config("birth grid step must be positive"));
        }
        let nx = Float::ceil(width / step).to_usize().unwrap_or(0);
        let ny = Float::ceil(height / step).to_usize().unwrap_or(0);

        let mut model = Self::new();
        for ix in 0..nx {
            let x = cast::<T>(ix as f64) * step;
            for iy in 0..ny {
                let y = cast::<T>(iy as f64) * step;
                model.add_birth_location(weight, place(x, y), covariance)?;
            }
        }
        Ok(model)
    }
}

fn check_birth<T: RealField + Copy, const N: usize>(
    weight: T,
    covariance: &StateCovariance<T, N>,
) -> Result<()> {
    if !(weight >= T::zero()) {
        return Err(PhdError::config("birth weight must be non-negative"));
    }
    (*covariance).validated("birth covariance")?;
    Ok(())
}

impl<T: RealField + Copy, const N: usize> Default for FixedBirthModel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Copy, const N: usize> BirthModel<T, N> for FixedBirthModel<T, N> {
    fn birth_components(&self) -> &[GaussianComponent<T, N>] {
        &self.components
    }

    fn total_birth_mass(&self) -> T {
        self.components
            .iter()
            .fold(T::zero(), |acc, c| acc + c.weight())
    }
}
