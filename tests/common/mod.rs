//! Common test helpers for GM-PHD integration tests

#![allow(dead_code)]

use phd_tracker::filters::phd::{GmPhdFilter, GmPhdTracker, LinearGmPhdTracker};
use phd_tracker::models::{
    ConstantClutter, ConstantVelocity2D, FixedBirthModel, PositionSensor2D,
};
use phd_tracker::tracking::BoxFootprint;
use phd_tracker::types::gaussian::GaussianComponent;
use phd_tracker::types::identity::ComponentId;
use phd_tracker::types::spaces::{Measurement, MeasurementCovariance, StateCovariance, StateVector};
use phd_tracker::types::transforms::{ObservationMatrix, TransitionMatrix};
use phd_tracker::utils::ExtractionConfig;

/// Tracker over a 4D constant velocity state observed by position.
pub type CvTracker = GmPhdTracker<
    f64,
    ConstantVelocity2D<f64>,
    PositionSensor2D<f64>,
    ConstantClutter<f64>,
    FixedBirthModel<f64, 4>,
    4,
    2,
>;

/// Creates a measurement at given position
pub fn make_measurement(x: f64, y: f64) -> Measurement<f64, 2> {
    Measurement::from_array([x, y])
}

/// Creates a 2D component with unit covariance
pub fn make_component(x: f64, y: f64, weight: f64, id: u64) -> GaussianComponent<f64, 2> {
    GaussianComponent::new(
        weight,
        StateVector::from_array([x, y]),
        StateCovariance::identity(),
        ComponentId(id),
    )
    .unwrap()
}

/// Static 2D tracker: one birth at the origin (weight 1e-3, unit covariance),
/// p_S 0.9, p_D 0.99, F = I, Q = 0, H = I, R = I, clutter 1e-6.
pub fn make_static_tracker() -> LinearGmPhdTracker<f64, 2, 2> {
    let mut birth = FixedBirthModel::new();
    birth
        .add_birth_location(1e-3, StateVector::zeros(), StateCovariance::identity())
        .unwrap();

    LinearGmPhdTracker::from_parameters(
        birth,
        0.9,
        0.99,
        TransitionMatrix::identity(),
        StateCovariance::zeros(),
        ObservationMatrix::from_matrix(nalgebra::SMatrix::identity()),
        MeasurementCovariance::identity(),
        1e-6,
    )
    .unwrap()
}

/// Birth covariance used by the constant velocity scenarios
pub fn birth_covariance() -> StateCovariance<f64, 4> {
    StateCovariance::from_matrix(nalgebra::matrix![
        100.0, 0.0, 0.0, 0.0;
        0.0, 100.0, 0.0, 0.0;
        0.0, 0.0, 25.0, 0.0;
        0.0, 0.0, 0.0, 25.0
    ])
}

/// Constant velocity tracker over a 200 x 200 region with births at the given points.
pub fn make_cv_tracker(birth_locations: &[(f64, f64)]) -> CvTracker {
    let transition = ConstantVelocity2D::new(1.0, [1.0, 1.0, 0.25, 0.25], 0.99).unwrap();
    let observation = PositionSensor2D::new(2.0, 2.0, 0.95).unwrap();
    let clutter = ConstantClutter::uniform(1.0, 200.0 * 200.0).unwrap();

    let mut birth = FixedBirthModel::new();
    for &(x, y) in birth_locations {
        birth
            .add_birth_location(0.1, StateVector::from_array([x, y, 0.0, 0.0]), birth_covariance())
            .unwrap();
    }

    let extraction = ExtractionConfig::new(
        1.0,
        BoxFootprint::Fixed {
            width: 10.0,
            height: 10.0,
        },
        1e8,
    )
    .unwrap();

    GmPhdTracker::new(GmPhdFilter::new(transition, observation, clutter, birth), extraction)
}

/// Advances ground-truth [x, y, vx, vy] states by one frame
pub fn step_truth(truth: &mut [[f64; 4]]) {
    for t in truth.iter_mut() {
        t[0] += t[2];
        t[1] += t[3];
    }
}

/// Distance from an estimate to the closest ground-truth position
pub fn distance_to_nearest(location: &StateVector<f64, 4>, truth: &[[f64; 4]]) -> f64 {
    truth
        .iter()
        .map(|t| (location.index(0) - t[0]).hypot(location.index(1) - t[1]))
        .fold(f64::INFINITY, f64::min)
}
