//! Multi-target scenarios over full frame sequences

mod common;

use std::sync::atomic::{AtomicBool, Ordering};

use common::*;
use phd_tracker::pipeline::{run_sequence, DetectionBox, DetectionSource, SequenceConfig};
use phd_tracker::tracking::TrackEstimate;
use phd_tracker::utils::PruningConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const FRAMES: usize = 20;

fn initial_truth() -> Vec<[f64; 4]> {
    vec![[20.0, 20.0, 2.0, 1.0], [150.0, 150.0, -1.0, -2.0]]
}

#[test]
fn test_two_crossing_targets_with_noise() {
    let mut tracker = make_cv_tracker(&[(20.0, 20.0), (150.0, 150.0)]);
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut truth = initial_truth();

    for _ in 0..FRAMES {
        step_truth(&mut truth);
        let observations: Vec<_> = truth
            .iter()
            .map(|t| make_measurement(t[0] + noise.sample(&mut rng), t[1] + noise.sample(&mut rng)))
            .collect();

        tracker.predict_update(&observations).unwrap();
        tracker.prune(1e-5, 4.0, 100).unwrap();
    }

    let count = tracker.expected_target_count();
    assert!(count > 1.8 && count < 2.4, "Expected ~2 targets, got {}", count);

    let estimates = tracker.extract(1.0);
    assert_eq!(estimates.len(), 2);
    for estimate in &estimates {
        let err = distance_to_nearest(&estimate.location, &truth);
        assert!(err < 5.0, "estimate {:?} is {} away from truth", estimate.location, err);
    }
    assert_ne!(estimates[0].track, estimates[1].track);

    let by_weight = tracker.extract_by_weight(1.0);
    assert_eq!(by_weight.len(), 2);
}

#[test]
fn test_missed_frames_reduce_expected_count() {
    let mut tracker = make_cv_tracker(&[(20.0, 20.0)]);
    let mut truth = vec![[20.0, 20.0, 1.0, 0.0]];

    for _ in 0..5 {
        step_truth(&mut truth);
        tracker
            .predict_update(&[make_measurement(truth[0][0], truth[0][1])])
            .unwrap();
        tracker.prune(1e-5, 4.0, 100).unwrap();
    }
    let tracked = tracker.expected_target_count();

    tracker.predict_update(&[]).unwrap();
    tracker.prune(1e-5, 4.0, 100).unwrap();

    assert!(
        tracker.expected_target_count() < 0.5 * tracked,
        "count {} should fall well below {} after a missed frame",
        tracker.expected_target_count(),
        tracked
    );
}

/// Replays ground truth as 10 x 10 boxes, optionally raising a flag at one frame.
struct TruthSource<'a> {
    truth: Vec<[f64; 4]>,
    cancel_at: Option<(usize, &'a AtomicBool)>,
}

impl DetectionSource<f64> for TruthSource<'_> {
    fn frame_range(&self) -> std::ops::Range<usize> {
        1..FRAMES + 1
    }

    fn detections(&mut self, frame: usize) -> Vec<DetectionBox<f64>> {
        if let Some((at, flag)) = self.cancel_at {
            if frame == at {
                flag.store(true, Ordering::Relaxed);
            }
        }
        step_truth(&mut self.truth);
        self.truth
            .iter()
            .map(|t| DetectionBox::new(t[0] - 5.0, t[1] - 5.0, 10.0, 10.0))
            .collect()
    }
}

#[test]
fn test_run_sequence_delivers_every_frame() {
    let mut tracker = make_cv_tracker(&[(20.0, 20.0), (150.0, 150.0)]);
    let mut source = TruthSource {
        truth: initial_truth(),
        cancel_at: None,
    };
    let mut sink: Vec<(usize, Vec<TrackEstimate<f64, 4>>)> = Vec::new();
    let config = SequenceConfig {
        pruning: PruningConfig::new(1e-5, 4.0, 100).unwrap(),
        headroom: Some(50),
        bias: 1.0,
    };

    let summary = run_sequence(
        &mut tracker,
        &mut source,
        &mut sink,
        &config,
        &AtomicBool::new(false),
    )
    .unwrap();

    assert_eq!(summary.frames_processed, FRAMES);
    assert!(!summary.cancelled);
    assert_eq!(sink.len(), FRAMES);
    assert_eq!(sink[0].0, 1);
    assert_eq!(sink.last().map(|(_, e)| e.len()), Some(2));
}

#[test]
fn test_run_sequence_stops_between_frames() {
    let cancel = AtomicBool::new(false);
    let mut tracker = make_cv_tracker(&[(20.0, 20.0), (150.0, 150.0)]);
    let mut source = TruthSource {
        truth: initial_truth(),
        cancel_at: Some((3, &cancel)),
    };
    let mut sink: Vec<(usize, Vec<TrackEstimate<f64, 4>>)> = Vec::new();

    let summary = run_sequence(
        &mut tracker,
        &mut source,
        &mut sink,
        &SequenceConfig::default(),
        &cancel,
    )
    .unwrap();

    // Frame 3 raised the flag mid-frame and still completed
    assert!(summary.cancelled);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(sink.iter().map(|(f, _)| *f).collect::<Vec<_>>(), vec![1, 2, 3]);
}
