//! Persistent track identities
//!
//! The filter itself has no notion of track identity. After extraction, the
//! identity tracker matches this frame's selected components against the
//! previous frame's output and carries persistent [`TrackId`]s across.
//!
//! Matching is only allowed between entries that share an internal
//! [`ComponentId`]; among those, cost is `1 - IoU` of the boxes rebuilt from
//! the two locations. A merge keeps only the seed's component identity, so
//! targets whose component was absorbed lose their track and get a new one.

use alloc::vec;
use alloc::vec::Vec;
use nalgebra::RealField;
use num_traits::Float;

use crate::assignment::{hungarian, CostMatrix};
use crate::types::gaussian::{cast, GaussianComponent};
use crate::types::identity::{ComponentId, TrackId};
use crate::types::spaces::StateVector;
use crate::utils::ExtractionConfig;

// ============================================================================
// Bounding Boxes
// ============================================================================

/// Axis-aligned box given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox<T> {
    /// Left edge
    pub left: T,
    /// Top edge
    pub top: T,
    /// Width
    pub width: T,
    /// Height
    pub height: T,
}

impl<T: RealField + Float + Copy> BoundingBox<T> {
    /// Creates a box from its top-left corner and size.
    pub fn new(left: T, top: T, width: T, height: T) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Creates a box of the given size centred on (cx, cy).
    pub fn centered(cx: T, cy: T, width: T, height: T) -> Self {
        let half = cast::<T>(0.5);
        Self::new(cx - width * half, cy - height * half, width, height)
    }

    /// Right edge.
    pub fn right(&self) -> T {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> T {
        self.top + self.height
    }

    /// Area, with negative extents counting as empty.
    pub fn area(&self) -> T {
        Float::max(self.width, T::zero()) * Float::max(self.height, T::zero())
    }

    /// True if every edge and extent is finite.
    pub fn is_finite(&self) -> bool {
        Float::is_finite(self.left)
            && Float::is_finite(self.top)
            && Float::is_finite(self.width)
            && Float::is_finite(self.height)
    }

    /// Intersection over union in [0, 1]. Two empty boxes have IoU 0.
    pub fn iou(&self, other: &Self) -> T {
        let ix = Float::min(self.right(), other.right()) - Float::max(self.left, other.left);
        let iy = Float::min(self.bottom(), other.bottom()) - Float::max(self.top, other.top);
        let inter = Float::max(ix, T::zero()) * Float::max(iy, T::zero());
        let union = self.area() + other.area() - inter;

        if union > T::zero() {
            inter / union
        } else {
            T::zero()
        }
    }
}

/// How a bounding box is rebuilt from a state location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxFootprint<T> {
    /// State is `[x, y, aspect, height, ..]` with (x, y) the box centre and
    /// width `aspect * height`.
    CenterAspectHeight,
    /// Box of fixed size centred on the first two state entries.
    Fixed {
        /// Box width
        width: T,
        /// Box height
        height: T,
    },
}

impl<T: RealField + Float + Copy> BoxFootprint<T> {
    /// Rebuilds the box for a location. Missing state entries read as zero.
    pub fn bounding_box<const N: usize>(&self, location: &StateVector<T, N>) -> BoundingBox<T> {
        let at = |i: usize| location.get(i).copied().unwrap_or_else(T::zero);
        match *self {
            BoxFootprint::CenterAspectHeight => {
                let height = at(3);
                BoundingBox::centered(at(0), at(1), at(2) * height, height)
            }
            BoxFootprint::Fixed { width, height } => BoundingBox::centered(at(0), at(1), width, height),
        }
    }
}

// ============================================================================
// Track Records
// ============================================================================

/// An extracted location remembered between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord<T: RealField, const N: usize> {
    /// Extracted location (component mean)
    pub location: StateVector<T, N>,
    /// Persistent identity
    pub track: TrackId,
    /// Internal identity of the component it was extracted from
    pub component: ComponentId,
}

/// A target estimate reported to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEstimate<T: RealField, const N: usize> {
    /// Estimated location
    pub location: StateVector<T, N>,
    /// Persistent identity
    pub track: TrackId,
    /// Weight of the component it was extracted from
    pub weight: T,
}

// ============================================================================
// Identity Tracker
// ============================================================================

/// Carries persistent identities from one frame's estimates to the next.
#[derive(Debug, Clone)]
pub struct IdentityTracker<T: RealField, const N: usize> {
    previous: Vec<TrackRecord<T, N>>,
    last_track: u64,
}

impl<T: RealField + Float + Copy, const N: usize> IdentityTracker<T, N> {
    /// Creates a tracker with no remembered output. The first minted track is 1.
    pub fn new() -> Self {
        Self {
            previous: Vec::new(),
            last_track: 0,
        }
    }

    /// The previous frame's output.
    pub fn previous(&self) -> &[TrackRecord<T, N>] {
        &self.previous
    }

    /// Forgets the previous output and restarts track numbering.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.last_track = 0;
    }

    /// Assigns persistent identities to this frame's selected components.
    ///
    /// Estimates come back in selection order, and the remembered output is
    /// replaced by them. If the assignment cannot be solved every estimate
    /// gets a fresh identity.
    pub fn assign(
        &mut self,
        selected: &[&GaussianComponent<T, N>],
        config: &ExtractionConfig<T>,
    ) -> Vec<TrackEstimate<T, N>> {
        let sentinel = config.sentinel_cost.to_f64().unwrap_or(f64::MAX);
        let mut tracks: Vec<Option<TrackId>> = vec![None; selected.len()];

        match self.cost_matrix(selected, config, sentinel).and_then(|cost| {
            let assignment = hungarian(&cost)?;
            Ok((cost, assignment))
        }) {
            Ok((cost, assignment)) => {
                for (row, col) in assignment.pairs() {
                    if cost.get(row, col) < sentinel {
                        tracks[col] = Some(self.previous[row].track);
                    }
                }
            }
            Err(err) => {
                log::warn!("identity assignment failed ({}), minting new tracks", err);
            }
        }

        let mut records = Vec::with_capacity(selected.len());
        let mut estimates = Vec::with_capacity(selected.len());
        for (component, track) in selected.iter().zip(tracks) {
            let track = match track {
                Some(track) => track,
                None => {
                    self.last_track += 1;
                    TrackId(self.last_track)
                }
            };
            records.push(TrackRecord {
                location: *component.mean(),
                track,
                component: component.id(),
            });
            estimates.push(TrackEstimate {
                location: *component.mean(),
                track,
                weight: component.weight(),
            });
        }

        log::debug!(
            "identities: {} previous, {} current, {} tracks minted so far",
            self.previous.len(),
            records.len(),
            self.last_track
        );
        self.previous = records;
        estimates
    }

    /// Previous x current costs. Pairs with equal component ids cost their
    /// IoU; every other pair costs the sentinel. A non-finite box makes the
    /// matrix malformed.
    fn cost_matrix(
        &self,
        selected: &[&GaussianComponent<T, N>],
        config: &ExtractionConfig<T>,
        sentinel: f64,
    ) -> crate::Result<CostMatrix> {
        let mut cost = CostMatrix::filled(self.previous.len(), selected.len(), sentinel);
        for (i, prev) in self.previous.iter().enumerate() {
            let prev_box = config.footprint.bounding_box(&prev.location);
            for (j, current) in selected.iter().enumerate() {
                if prev.component != current.id() {
                    continue;
                }
                let current_box = config.footprint.bounding_box(current.mean());
                if !prev_box.is_finite() || !current_box.is_finite() {
                    return Err(crate::PhdError::AssignmentFailed);
                }
                let value = prev_box
                    .iou(&current_box)
                    .to_f64()
                    .ok_or(crate::PhdError::AssignmentFailed)?;
                cost.set(i, j, value);
            }
        }
        Ok(cost)
    }
}

impl<T: RealField + Float + Copy, const N: usize> Default for IdentityTracker<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::spaces::StateCovariance;

    fn component(x: f64, id: u64) -> GaussianComponent<f64, 4> {
        GaussianComponent::new(
            0.9,
            StateVector::from_array([x, 50.0, 0.5, 100.0]),
            StateCovariance::identity(),
            ComponentId(id),
        )
        .unwrap()
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0_f64, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);

        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
        // overlap 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(a.iou(&BoundingBox::new(20.0, 20.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_center_aspect_height_footprint() {
        let location = StateVector::from_array([100.0_f64, 200.0, 0.5, 80.0]);
        let b = BoxFootprint::CenterAspectHeight.bounding_box(&location);

        assert_eq!(b, BoundingBox::new(80.0, 160.0, 40.0, 80.0));
    }

    #[test]
    fn test_fixed_footprint_on_point_state() {
        let location = StateVector::from_array([10.0_f64, 20.0, 1.0, -1.0]);
        let b = BoxFootprint::Fixed {
            width: 4.0,
            height: 2.0,
        }
        .bounding_box(&location);

        assert_eq!(b, BoundingBox::new(8.0, 19.0, 4.0, 2.0));
    }

    #[test]
    fn test_identity_carried_by_component_id() {
        let config = ExtractionConfig::default();
        let mut tracker = IdentityTracker::new();

        let a = component(100.0, 3);
        let b = component(300.0, 4);
        let first = tracker.assign(&[&a, &b], &config);
        assert_eq!(first[0].track, TrackId(1));
        assert_eq!(first[1].track, TrackId(2));

        // Same components, moved slightly and reordered
        let a2 = component(102.0, 3);
        let b2 = component(301.0, 4);
        let second = tracker.assign(&[&b2, &a2], &config);
        assert_eq!(second[0].track, TrackId(2));
        assert_eq!(second[1].track, TrackId(1));
    }

    #[test]
    fn test_unmatched_components_get_new_tracks() {
        let config = ExtractionConfig::default();
        let mut tracker = IdentityTracker::new();

        let a = component(100.0, 3);
        tracker.assign(&[&a], &config);

        // Same place, different component identity: sentinel cost only
        let other = component(100.0, 9);
        let estimates = tracker.assign(&[&other], &config);
        assert_eq!(estimates[0].track, TrackId(2));
        assert_eq!(tracker.previous()[0].component, ComponentId(9));
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let config = ExtractionConfig::default();
        let mut tracker = IdentityTracker::new();

        let a = component(100.0, 3);
        tracker.assign(&[&a], &config);
        tracker.reset();

        assert!(tracker.previous().is_empty());
        assert_eq!(tracker.assign(&[&a], &config)[0].track, TrackId(1));
    }

    #[test]
    fn test_shared_component_id_prefers_lowest_overlap() {
        let config = ExtractionConfig::default();
        let mut tracker = IdentityTracker::new();

        // Two records share c5; IoU is the cost, so the far record wins
        let near = component(100.0, 5);
        let far = component(300.0, 5);
        tracker.assign(&[&near, &far], &config);

        let current = component(101.0, 5);
        let estimates = tracker.assign(&[&current], &config);
        assert_eq!(estimates[0].track, TrackId(2));
    }

    #[test]
    fn test_malformed_costs_mint_new_tracks() {
        let config = ExtractionConfig::default();
        let mut tracker = IdentityTracker::new();

        let a = component(100.0, 3);
        let b = component(300.0, 4);
        tracker.assign(&[&a, &b], &config);

        let broken = component(f64::NAN, 3);
        let b2 = component(301.0, 4);
        let estimates = tracker.assign(&[&broken, &b2], &config);

        assert_eq!(estimates[0].track, TrackId(3));
        assert_eq!(estimates[1].track, TrackId(4));
        let previous = tracker.previous();
        assert_eq!(previous.len(), 2);
        assert_eq!(previous[0].component, ComponentId(3));
        assert_eq!(previous[1].track, TrackId(4));
    }
}
