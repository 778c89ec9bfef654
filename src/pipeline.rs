//! Frame-sequence driver
//!
//! Connects a source of per-frame detection boxes to a [`GmPhdTracker`] and
//! hands each frame's estimates to a sink. Reading detections from disk and
//! drawing the results belong to the caller.

use ::core::ops::Range;
use ::core::sync::atomic::{AtomicBool, Ordering};
use alloc::vec::Vec;
use nalgebra::RealField;
use num_traits::Float;

use crate::filters::executor::ObservationMapper;
use crate::filters::phd::GmPhdTracker;
use crate::models::{BirthModel, ClutterModel, ObservationModel, TransitionModel};
use crate::tracking::{BoundingBox, TrackEstimate};
use crate::types::gaussian::cast;
use crate::types::spaces::Measurement;
use crate::utils::PruningConfig;
use crate::Result;

/// A raw detection: top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBox<T> {
    /// Left edge
    pub left: T,
    /// Top edge
    pub top: T,
    /// Width
    pub width: T,
    /// Height
    pub height: T,
}

impl<T: RealField + Float + Copy> DetectionBox<T> {
    /// Creates a detection box.
    pub fn new(left: T, top: T, width: T, height: T) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The box centre as an observation point.
    pub fn center(&self) -> Measurement<T, 2> {
        let half = cast::<T>(0.5);
        Measurement::from_array([self.left + self.width * half, self.top + self.height * half])
    }

    /// The same box as a [`BoundingBox`].
    pub fn bounding_box(&self) -> BoundingBox<T> {
        BoundingBox::new(self.left, self.top, self.width, self.height)
    }
}

/// Supplies detection boxes frame by frame.
pub trait DetectionSource<T> {
    /// Frame indices to process, in order.
    fn frame_range(&self) -> Range<usize>;

    /// Detections for one frame. A frame without detections is empty.
    fn detections(&mut self, frame: usize) -> Vec<DetectionBox<T>>;
}

/// Receives each frame's estimates.
pub trait TrackSink<T: RealField, const N: usize> {
    /// Called once per processed frame.
    fn consume(&mut self, frame: usize, estimates: &[TrackEstimate<T, N>]);
}

impl<T: RealField, const N: usize> TrackSink<T, N> for Vec<(usize, Vec<TrackEstimate<T, N>>)> {
    fn consume(&mut self, frame: usize, estimates: &[TrackEstimate<T, N>]) {
        self.push((frame, estimates.to_vec()));
    }
}

/// Per-frame settings for [`run_sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceConfig<T: RealField> {
    /// Pruning thresholds and default cap
    pub pruning: PruningConfig<T>,
    /// When set, the cap for a frame is its detection count plus this headroom
    pub headroom: Option<usize>,
    /// Extraction bias
    pub bias: T,
}

impl<T: RealField + Copy> Default for SequenceConfig<T> {
    fn default() -> Self {
        Self {
            pruning: PruningConfig::default(),
            headroom: None,
            bias: T::one(),
        }
    }
}

/// Outcome of [`run_sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSummary {
    /// Frames fully processed and delivered to the sink
    pub frames_processed: usize,
    /// True if the run stopped early because of the cancellation flag
    pub cancelled: bool,
}

/// Runs predict/update, prune and extract for every frame of `source`.
///
/// `cancel` is checked before each frame; a frame that has started always
/// completes. A numerical error stops the run and is returned.
pub fn run_sequence<T, Trans, Obs, Clutter, Birth, const N: usize, E, S, K>(
    tracker: &mut GmPhdTracker<T, Trans, Obs, Clutter, Birth, N, 2, E>,
    source: &mut S,
    sink: &mut K,
    config: &SequenceConfig<T>,
    cancel: &AtomicBool,
) -> Result<SequenceSummary>
where
    T: RealField + Float + Copy,
    Trans: TransitionModel<T, N>,
    Obs: ObservationModel<T, N, 2>,
    Clutter: ClutterModel<T, 2> + Sync,
    Birth: BirthModel<T, N>,
    E: ObservationMapper,
    S: DetectionSource<T>,
    K: TrackSink<T, N>,
{
    let mut summary = SequenceSummary {
        frames_processed: 0,
        cancelled: false,
    };

    for frame in source.frame_range() {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("sequence cancelled before frame {}", frame);
            summary.cancelled = true;
            break;
        }

        let detections = source.detections(frame);
        let observations: Vec<_> = detections.iter().map(DetectionBox::center).collect();
        tracker.predict_update(&observations)?;

        let pruning = match config.headroom {
            Some(headroom) => PruningConfig {
                max_components: observations.len() + headroom,
                ..config.pruning.clone()
            },
            None => config.pruning.clone(),
        };
        tracker.prune_with(&pruning)?;

        let estimates = tracker.extract(config.bias);
        log::debug!(
            "frame {}: {} detections, {} components, {} estimates",
            frame,
            observations.len(),
            tracker.mixture().len(),
            estimates.len()
        );
        sink.consume(frame, &estimates);
        summary.frames_processed += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_center() {
        let det = DetectionBox::new(10.0_f64, 20.0, 30.0, 40.0);
        let z = det.center();

        assert_eq!(*z.index(0), 25.0);
        assert_eq!(*z.index(1), 40.0);
        assert_eq!(det.bounding_box().right(), 40.0);
    }
}
