//! Filter phase markers
//!
//! A predicted state can only be updated and an updated state can only be
//! predicted; the markers make the wrong order a compile error.

/// Marker type indicating a predicted filter state.
#[derive(Debug, Clone, Copy)]
pub struct Predicted;

/// Marker type indicating an updated filter state.
#[derive(Debug, Clone, Copy)]
pub struct Updated;
