//! Gaussian Mixture Probability Hypothesis Density (GM-PHD) Filter
//!
//! Reference: Vo, B.-N., & Ma, W.-K. (2006). "The Gaussian Mixture
//! Probability Hypothesis Density Filter"
//!
//! Each stage consumes a mixture by reference and produces a new one; nothing
//! is modified in place, so a failed frame leaves the previous state intact.

use ::core::marker::PhantomData;
use alloc::vec::Vec;
use nalgebra::RealField;
use num_traits::Float;

use super::executor::{ObservationMapper, SerialMapper};
use crate::models::{
    BirthModel, ClutterModel, ConstantClutter, FixedBirthModel, LinearObservation,
    LinearTransition, ObservationModel, TransitionModel,
};
use crate::tracking::{IdentityTracker, TrackEstimate};
use crate::types::gaussian::{gaussian_density, GaussianComponent, GaussianMixture};
use crate::types::identity::ComponentIdGenerator;
use crate::types::spaces::{
    ComputeInnovation, Measurement, MeasurementCovariance, StateCovariance, StateVector,
};
use crate::types::transforms::{
    compute_innovation_covariance, compute_kalman_gain, corrected_covariance, KalmanGain,
    ObservationMatrix, TransitionMatrix,
};
use crate::utils::{
    estimate_target_count, extract_by_weight, prune, select_heaviest, ExtractionConfig,
    PruneReport, PruningConfig,
};
use crate::{PhdError, Result};

pub use crate::types::phase::{Predicted, Updated};

// ============================================================================
// PHD Filter State
// ============================================================================

/// The state of a GM-PHD filter at a particular phase.
///
/// The `Phase` parameter encodes whether this is a predicted or updated state,
/// ensuring correct operation ordering at compile time.
#[derive(Debug, Clone)]
pub struct PhdFilterState<T: RealField, const N: usize, Phase> {
    /// Gaussian mixture representing the PHD
    pub mixture: GaussianMixture<T, N>,
    /// Number of predictions performed so far
    pub time_step: u32,
    _phase: PhantomData<Phase>,
}

impl<T: RealField + Copy, const N: usize, Phase> PhdFilterState<T, N, Phase> {
    /// Returns the expected number of targets.
    pub fn expected_target_count(&self) -> T {
        self.mixture.total_weight()
    }
}

impl<T: RealField + Float + Copy, const N: usize> PhdFilterState<T, N, Updated> {
    /// Creates an empty filter state in the updated phase.
    pub fn new() -> Self {
        Self::from_mixture(GaussianMixture::new())
    }

    /// Creates a filter state from an initial mixture.
    pub fn from_mixture(mixture: GaussianMixture<T, N>) -> Self {
        Self {
            mixture,
            time_step: 0,
            _phase: PhantomData,
        }
    }

    /// Predicts the PHD to the next frame.
    ///
    /// The result holds a copy of every birth component, identities unchanged,
    /// followed by every surviving component with weight `w * p_S`, mean
    /// `F m`, covariance `F P F' + Q` and its identity unchanged.
    ///
    /// Fails with [`PhdError::SingularMatrix`] if a predicted covariance
    /// cannot be inverted.
    pub fn predict<Trans, Birth>(
        &self,
        transition_model: &Trans,
        birth_model: &Birth,
    ) -> Result<PhdFilterState<T, N, Predicted>>
    where
        Trans: TransitionModel<T, N>,
        Birth: BirthModel<T, N>,
    {
        let transition_matrix = transition_model.transition_matrix();
        let process_noise = transition_model.process_noise();
        let births = birth_model.birth_components();

        let mut predicted = GaussianMixture::with_capacity(self.mixture.len() + births.len());
        predicted.extend(births.iter().cloned());

        for component in self.mixture.iter() {
            predicted.push(predict_component(
                component,
                &transition_matrix,
                &process_noise,
                transition_model.survival_probability(component.mean()),
            )?);
        }

        log::debug!(
            "predict: {} births + {} survivors, expected count {}",
            births.len(),
            self.mixture.len(),
            predicted.total_weight()
        );

        Ok(PhdFilterState {
            mixture: predicted,
            time_step: self.time_step + 1,
            _phase: PhantomData,
        })
    }
}

impl<T: RealField + Float + Copy, const N: usize> Default for PhdFilterState<T, N, Updated> {
    fn default() -> Self {
        Self::new()
    }
}

fn predict_component<T: RealField + Copy, const N: usize>(
    component: &GaussianComponent<T, N>,
    transition_matrix: &TransitionMatrix<T, N>,
    process_noise: &StateCovariance<T, N>,
    p_survival: T,
) -> Result<GaussianComponent<T, N>> {
    GaussianComponent::new(
        component.weight() * p_survival,
        transition_matrix.apply_state(component.mean()),
        transition_matrix.propagate_covariance(component.covariance()) + *process_noise,
        component.id(),
    )
}

/// Per-component quantities shared by every observation in a frame.
struct ComponentCorrection<T: RealField, const N: usize, const M: usize> {
    p_detection: T,
    predicted_measurement: Measurement<T, M>,
    innovation_covariance: MeasurementCovariance<T, M>,
    gain: KalmanGain<T, N, M>,
    /// Corrected covariance (with its inverse) and the predicted mean
    corrected: GaussianComponent<T, N>,
}

impl<T: RealField + Float + Copy, const N: usize, const M: usize> ComponentCorrection<T, N, M> {
    fn new(
        component: &GaussianComponent<T, N>,
        obs_matrix: &ObservationMatrix<T, M, N>,
        meas_noise: &MeasurementCovariance<T, M>,
        p_detection: T,
    ) -> Result<Self> {
        let innovation_covariance =
            compute_innovation_covariance(component.covariance(), obs_matrix, meas_noise);
        if innovation_covariance.determinant().is_none() {
            return Err(PhdError::NotPositiveDefinite {
                context: "innovation covariance",
            });
        }
        let gain = compute_kalman_gain(component.covariance(), obs_matrix, &innovation_covariance)?;
        let corrected = GaussianComponent::new(
            T::zero(),
            *component.mean(),
            corrected_covariance(component.covariance(), &gain, obs_matrix),
            component.id(),
        )?;

        Ok(Self {
            p_detection,
            predicted_measurement: obs_matrix.observe(component.mean()),
            innovation_covariance,
            gain,
            corrected,
        })
    }
}

impl<T: RealField + Float + Copy, const N: usize> PhdFilterState<T, N, Predicted> {
    /// Folds one frame's observations into the predicted intensity.
    ///
    /// The result holds the missed-detection branch (every predicted
    /// component with weight `w * (1 - p_D)`) followed by one batch per
    /// observation, in observation order. Each batch holds one corrected
    /// component per predicted component with a freshly minted identity, and
    /// is normalised by `κ(z)` plus the batch's own weight sum.
    ///
    /// Observation batches are computed by `mapper`. Any failure fails the
    /// whole frame.
    pub fn update<const M: usize, Obs, Clutter, E>(
        &self,
        observations: &[Measurement<T, M>],
        observation_model: &Obs,
        clutter_model: &Clutter,
        id_generator: &mut ComponentIdGenerator,
        mapper: &E,
    ) -> Result<PhdFilterState<T, N, Updated>>
    where
        Obs: ObservationModel<T, N, M>,
        Clutter: ClutterModel<T, M> + Sync,
        E: ObservationMapper,
    {
        let obs_matrix = observation_model.observation_matrix();
        let meas_noise = observation_model.measurement_noise();
        let n_predicted = self.mixture.len();

        let corrections = self
            .mixture
            .iter()
            .map(|c| {
                ComponentCorrection::new(
                    c,
                    &obs_matrix,
                    &meas_noise,
                    observation_model.detection_probability(c.mean()),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let mut updated =
            GaussianMixture::with_capacity(n_predicted * (observations.len() + 1));

        updated.extend(
            self.mixture
                .iter()
                .zip(&corrections)
                .map(|(c, k)| c.scale_weight(T::one() - k.p_detection)),
        );

        let block = id_generator.reserve(observations.len() * n_predicted);
        let batches = mapper.map_observations(observations.len(), |obs_index| {
            let measurement = &observations[obs_index];
            let ids = block.batch(obs_index, n_predicted);

            let mut weights = Vec::with_capacity(n_predicted);
            for (component, k) in self.mixture.iter().zip(&corrections) {
                let likelihood = gaussian_density(
                    &k.predicted_measurement,
                    &k.innovation_covariance,
                    measurement,
                )?;
                weights.push(k.p_detection * component.weight() * likelihood);
            }

            let detected = weights.iter().fold(T::zero(), |acc, w| acc + *w);
            let denominator = clutter_model.clutter_intensity(measurement) + detected;
            log::trace!(
                "update: observation {} detection mass {} normaliser {}",
                obs_index,
                detected,
                denominator
            );

            Ok(corrections
                .iter()
                .zip(weights)
                .enumerate()
                .map(|(j, (k, weight))| {
                    let innovation = measurement.innovation(k.predicted_measurement);
                    let mean = *k.corrected.mean() + k.gain.correct(&innovation);
                    k.corrected.with_mean(weight / denominator, mean, ids.get(j))
                })
                .collect::<Vec<_>>())
        })?;

        for batch in batches {
            updated.extend(batch);
        }

        log::debug!(
            "update: {} predicted x {} observations -> {} components, expected count {}",
            n_predicted,
            observations.len(),
            updated.len(),
            updated.total_weight()
        );

        Ok(PhdFilterState {
            mixture: updated,
            time_step: self.time_step,
            _phase: PhantomData,
        })
    }
}

// ============================================================================
// GM-PHD Filter
// ============================================================================

/// The immutable model set of a GM-PHD filter.
#[derive(Debug, Clone)]
pub struct GmPhdFilter<T, Trans, Obs, Clutter, Birth, const N: usize, const M: usize>
where
    T: RealField,
    Trans: TransitionModel<T, N>,
    Obs: ObservationModel<T, N, M>,
    Clutter: ClutterModel<T, M>,
    Birth: BirthModel<T, N>,
{
    /// Transition model
    pub transition: Trans,
    /// Observation model
    pub observation: Obs,
    /// Clutter model
    pub clutter: Clutter,
    /// Birth model
    pub birth: Birth,
    _marker: PhantomData<T>,
}

impl<T, Trans, Obs, Clutter, Birth, const N: usize, const M: usize>
    GmPhdFilter<T, Trans, Obs, Clutter, Birth, N, M>
where
    T: RealField + Float + Copy,
    Trans: TransitionModel<T, N>,
    Obs: ObservationModel<T, N, M>,
    Clutter: ClutterModel<T, M>,
    Birth: BirthModel<T, N>,
{
    /// Creates a new GM-PHD filter with the specified models.
    pub fn new(transition: Trans, observation: Obs, clutter: Clutter, birth: Birth) -> Self {
        Self {
            transition,
            observation,
            clutter,
            birth,
            _marker: PhantomData,
        }
    }

    /// Runs one predict-update cycle.
    pub fn step<E: ObservationMapper>(
        &self,
        state: &PhdFilterState<T, N, Updated>,
        observations: &[Measurement<T, M>],
        id_generator: &mut ComponentIdGenerator,
        mapper: &E,
    ) -> Result<PhdFilterState<T, N, Updated>>
    where
        Clutter: Sync,
    {
        state.predict(&self.transition, &self.birth)?.update(
            observations,
            &self.observation,
            &self.clutter,
            id_generator,
            mapper,
        )
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// A GM-PHD filter together with its running state and track identities.
///
/// Per frame: [`predict_update`](Self::predict_update), then
/// [`prune`](Self::prune), then [`extract`](Self::extract).
#[derive(Debug)]
pub struct GmPhdTracker<T, Trans, Obs, Clutter, Birth, const N: usize, const M: usize, E = SerialMapper>
where
    T: RealField,
    Trans: TransitionModel<T, N>,
    Obs: ObservationModel<T, N, M>,
    Clutter: ClutterModel<T, M>,
    Birth: BirthModel<T, N>,
{
    filter: GmPhdFilter<T, Trans, Obs, Clutter, Birth, N, M>,
    state: PhdFilterState<T, N, Updated>,
    component_ids: ComponentIdGenerator,
    identities: IdentityTracker<T, N>,
    extraction: ExtractionConfig<T>,
    mapper: E,
}

/// Tracker built from plain matrices with constant probabilities and clutter.
pub type LinearGmPhdTracker<T, const N: usize, const M: usize, E = SerialMapper> = GmPhdTracker<
    T,
    LinearTransition<T, N>,
    LinearObservation<T, N, M>,
    ConstantClutter<T>,
    FixedBirthModel<T, N>,
    N,
    M,
    E,
>;

impl<T, Trans, Obs, Clutter, Birth, const N: usize, const M: usize>
    GmPhdTracker<T, Trans, Obs, Clutter, Birth, N, M, SerialMapper>
where
    T: RealField + Float + Copy,
    Trans: TransitionModel<T, N>,
    Obs: ObservationModel<T, N, M>,
    Clutter: ClutterModel<T, M>,
    Birth: BirthModel<T, N>,
{
    /// Creates a tracker that corrects observations on the calling thread.
    pub fn new(
        filter: GmPhdFilter<T, Trans, Obs, Clutter, Birth, N, M>,
        extraction: ExtractionConfig<T>,
    ) -> Self {
        let component_ids = ComponentIdGenerator::starting_at(filter.birth.next_free_id());
        Self {
            filter,
            state: PhdFilterState::new(),
            component_ids,
            identities: IdentityTracker::new(),
            extraction,
            mapper: SerialMapper,
        }
    }
}

impl<T, const N: usize, const M: usize> LinearGmPhdTracker<T, N, M>
where
    T: RealField + Float + Copy,
{
    /// Creates a tracker from the birth mixture and raw model parameters.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] if a probability is outside
    /// [0, 1], `clutter_intensity` is not positive, Q is not positive
    /// semi-definite or R is not positive definite.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parameters(
        birth: FixedBirthModel<T, N>,
        p_survival: T,
        p_detection: T,
        transition_matrix: TransitionMatrix<T, N>,
        process_noise: StateCovariance<T, N>,
        observation_matrix: ObservationMatrix<T, M, N>,
        observation_noise: MeasurementCovariance<T, M>,
        clutter_intensity: T,
    ) -> Result<Self> {
        let filter = GmPhdFilter::new(
            LinearTransition::new(transition_matrix, process_noise, p_survival)?,
            LinearObservation::new(observation_matrix, observation_noise, p_detection)?,
            ConstantClutter::new(clutter_intensity)?,
            birth,
        );
        Ok(Self::new(filter, ExtractionConfig::default()))
    }
}

impl<T, Trans, Obs, Clutter, Birth, const N: usize, const M: usize, E>
    GmPhdTracker<T, Trans, Obs, Clutter, Birth, N, M, E>
where
    T: RealField + Float + Copy,
    Trans: TransitionModel<T, N>,
    Obs: ObservationModel<T, N, M>,
    Clutter: ClutterModel<T, M>,
    Birth: BirthModel<T, N>,
    E: ObservationMapper,
{
    /// Replaces the executor used for the per-observation correction.
    pub fn with_mapper<E2: ObservationMapper>(
        self,
        mapper: E2,
    ) -> GmPhdTracker<T, Trans, Obs, Clutter, Birth, N, M, E2> {
        GmPhdTracker {
            filter: self.filter,
            state: self.state,
            component_ids: self.component_ids,
            identities: self.identities,
            extraction: self.extraction,
            mapper,
        }
    }

    /// Replaces the extraction configuration.
    pub fn with_extraction(mut self, extraction: ExtractionConfig<T>) -> Self {
        self.extraction = extraction;
        self
    }

    /// Predicts one frame ahead and folds in this frame's observations.
    ///
    /// On error the mixture is left as it was before the call.
    pub fn predict_update(&mut self, observations: &[Measurement<T, M>]) -> Result<()>
    where
        Clutter: Sync,
    {
        let mut ids = self.component_ids.clone();
        let updated = self
            .filter
            .step(&self.state, observations, &mut ids, &self.mapper)?;
        self.state = updated;
        self.component_ids = ids;
        Ok(())
    }

    /// Truncates, merges, caps and renormalises the mixture.
    ///
    /// # Errors
    /// Returns [`PhdError::Configuration`] for a negative threshold, or a
    /// numerical error if a merged covariance cannot be inverted.
    pub fn prune(
        &mut self,
        truncation_threshold: T,
        merge_threshold: T,
        max_components: usize,
    ) -> Result<PruneReport<T>> {
        let config = PruningConfig::new(truncation_threshold, merge_threshold, max_components)?;
        self.prune_with(&config)
    }

    /// Prunes with a prepared configuration.
    pub fn prune_with(&mut self, config: &PruningConfig<T>) -> Result<PruneReport<T>> {
        let (pruned, report) = prune(&self.state.mixture, config)?;
        self.state.mixture = pruned;
        Ok(report)
    }

    /// Extracts `round(calibration * total weight)` targets (at most one per
    /// component) and assigns them persistent identities.
    ///
    /// `bias` is only logged here; it scales [`Self::extract_by_weight`].
    /// The returned estimates become the remembered previous frame.
    pub fn extract(&mut self, bias: T) -> Vec<TrackEstimate<T, N>> {
        let count = estimate_target_count(&self.state.mixture, self.extraction.calibration);
        log::debug!(
            "extract: {} of {} components (bias {})",
            count,
            self.state.mixture.len(),
            bias
        );
        let selected = select_heaviest(&self.state.mixture, count);
        self.identities.assign(&selected, &self.extraction)
    }

    /// Threshold extraction without identities; see [`extract_by_weight`].
    pub fn extract_by_weight(&self, bias: T) -> Vec<StateVector<T, N>> {
        extract_by_weight(&self.state.mixture, bias)
    }

    /// Clears the mixture, the remembered previous output and all identity
    /// counters.
    pub fn reset(&mut self) {
        self.state = PhdFilterState::new();
        self.component_ids = ComponentIdGenerator::starting_at(self.filter.birth.next_free_id());
        self.identities.reset();
    }

    /// The current mixture.
    pub fn mixture(&self) -> &GaussianMixture<T, N> {
        &self.state.mixture
    }

    /// The current expected number of targets.
    pub fn expected_target_count(&self) -> T {
        self.state.expected_target_count()
    }

    /// Number of frames processed since creation or the last reset.
    pub fn time_step(&self) -> u32 {
        self.state.time_step
    }

    /// The filter models.
    pub fn filter(&self) -> &GmPhdFilter<T, Trans, Obs, Clutter, Birth, N, M> {
        &self.filter
    }

    /// The extraction configuration.
    pub fn extraction_config(&self) -> &ExtractionConfig<T> {
        &self.extraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::identity::ComponentId;

    fn models() -> (LinearTransition<f64, 2>, LinearObservation<f64, 2, 2>, ConstantClutter<f64>) {
        (
            LinearTransition::new(TransitionMatrix::identity(), StateCovariance::zeros(), 0.9)
                .unwrap(),
            LinearObservation::new(
                ObservationMatrix::from_matrix(nalgebra::SMatrix::identity()),
                MeasurementCovariance::identity(),
                0.99,
            )
            .unwrap(),
            ConstantClutter::new(1e-6).unwrap(),
        )
    }

    fn birth() -> FixedBirthModel<f64, 2> {
        let mut birth = FixedBirthModel::new();
        birth
            .add_birth_location(1e-3, StateVector::zeros(), StateCovariance::identity())
            .unwrap();
        birth
    }

    #[test]
    fn test_predict_weight_sum() {
        let (transition, _, _) = models();
        let birth = birth();
        let prior = GaussianMixture::from_components(alloc::vec![GaussianComponent::new(
            0.5,
            StateVector::from_array([3.0, 4.0]),
            StateCovariance::identity(),
            ComponentId(10),
        )
        .unwrap()]);

        let predicted = PhdFilterState::from_mixture(prior)
            .predict(&transition, &birth)
            .unwrap();

        assert_eq!(predicted.mixture.len(), 2);
        assert!((predicted.expected_target_count() - (1e-3 + 0.9 * 0.5)).abs() < 1e-12);
        // birth first, survivors keep their identity
        assert_eq!(predicted.mixture.components[0].id(), ComponentId(0));
        assert_eq!(predicted.mixture.components[1].id(), ComponentId(10));
        assert_eq!(predicted.time_step, 1);
    }

    #[test]
    fn test_update_without_observations() {
        let (transition, observation, clutter) = models();
        let birth = birth();
        let mut ids = ComponentIdGenerator::starting_at(1);

        let none: [Measurement<f64, 2>; 0] = [];

        let predicted = PhdFilterState::new().predict(&transition, &birth).unwrap();
        let updated = predicted
            .update(&none, &observation, &clutter, &mut ids, &SerialMapper)
            .unwrap();

        assert_eq!(updated.mixture.len(), 1);
        assert!((updated.mixture.components[0].weight() - 1e-3 * 0.01).abs() < 1e-15);
        assert_eq!(ids.peek(), ComponentId(1));
    }

    #[test]
    fn test_update_single_observation() {
        let (transition, observation, clutter) = models();
        let birth = birth();
        let mut ids = ComponentIdGenerator::starting_at(1);
        let z = Measurement::from_array([0.0, 0.0]);

        let predicted = PhdFilterState::new().predict(&transition, &birth).unwrap();
        let updated = predicted
            .update(&[z], &observation, &clutter, &mut ids, &SerialMapper)
            .unwrap();

        // S = 2I, N(0; 0, 2I) = 1 / (4 pi)
        let detected = 0.99 * 1e-3 / (4.0 * core::f64::consts::PI);
        let expected = detected / (1e-6 + detected);

        assert_eq!(updated.mixture.len(), 2);
        let corrected = &updated.mixture.components[1];
        assert!((corrected.weight() - expected).abs() < 1e-12);
        assert!((corrected.covariance().as_matrix()[(0, 0)] - 0.5).abs() < 1e-12);
        assert_eq!(corrected.id(), ComponentId(1));
    }

    #[test]
    fn test_tracker_reset() {
        let (transition, observation, clutter) = models();
        let filter = GmPhdFilter::new(transition, observation, clutter, birth());
        let mut tracker = GmPhdTracker::new(filter, ExtractionConfig::default());

        tracker
            .predict_update(&[Measurement::from_array([0.0, 0.0])])
            .unwrap();
        assert_eq!(tracker.time_step(), 1);
        assert!(!tracker.mixture().is_empty());

        tracker.reset();
        assert!(tracker.mixture().is_empty());
        assert_eq!(tracker.time_step(), 0);
    }
}
