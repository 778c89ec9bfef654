//! Assignment problem solvers
//!
//! Optimal one-to-one matching between previous and current track sets.

pub mod hungarian;

pub use hungarian::*;
