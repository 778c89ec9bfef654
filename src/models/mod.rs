//! Model traits for the GM-PHD filter
//!
//! Target dynamics, sensor characteristics, clutter and target birth.

mod transition;
mod observation;
mod clutter;
mod birth;

pub use transition::*;
pub use observation::*;
pub use clutter::*;
pub use birth::*;
