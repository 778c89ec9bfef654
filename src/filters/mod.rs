//! The GM-PHD filter
//!
//! - [`phd::PhdFilterState`]: predict and update on a typed filter phase
//! - [`phd::GmPhdTracker`]: filter, running state and track identities
//! - [`executor`]: serial or pooled correction of observation batches

pub mod executor;
pub mod phd;
