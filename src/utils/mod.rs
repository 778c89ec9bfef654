//! Utility functions for multi-target tracking
//!
//! Component pruning, merging, and state extraction utilities.

mod pruning;
mod extraction;

pub use pruning::*;
pub use extraction::*;
