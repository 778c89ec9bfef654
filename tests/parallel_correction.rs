//! Pooled correction must reproduce the serial mixture exactly

#![cfg(feature = "parallel")]

mod common;

use common::*;
use phd_tracker::filters::executor::PooledMapper;

#[test]
fn test_pooled_matches_serial() {
    let mut serial = make_cv_tracker(&[(20.0, 20.0), (150.0, 150.0)]);
    let mut pooled = make_cv_tracker(&[(20.0, 20.0), (150.0, 150.0)])
        .with_mapper(PooledMapper::new(3).unwrap());
    let mut truth = vec![[20.0, 20.0, 2.0, 1.0], [150.0, 150.0, -1.0, -2.0]];

    for frame in 0..8 {
        step_truth(&mut truth);
        let mut observations: Vec<_> = truth.iter().map(|t| make_measurement(t[0], t[1])).collect();
        // A stray detection every other frame
        if frame % 2 == 0 {
            observations.push(make_measurement(100.0, 30.0));
        }

        serial.predict_update(&observations).unwrap();
        pooled.predict_update(&observations).unwrap();
        serial.prune(1e-5, 4.0, 100).unwrap();
        pooled.prune(1e-5, 4.0, 100).unwrap();

        assert_eq!(serial.mixture().len(), pooled.mixture().len());
        for (a, b) in serial.mixture().iter().zip(pooled.mixture().iter()) {
            assert_eq!(a.id(), b.id());
            assert!((a.weight() - b.weight()).abs() < 1e-12);
            assert!((a.mean().as_svector() - b.mean().as_svector()).norm() < 1e-9);
        }
    }

    let a: Vec<_> = serial.extract(1.0).iter().map(|e| e.track).collect();
    let b: Vec<_> = pooled.extract(1.0).iter().map(|e| e.track).collect();
    assert_eq!(a, b);
}
