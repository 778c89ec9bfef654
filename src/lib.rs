//! PHD-Tracker: Gaussian-Mixture PHD multi-target tracking
//!
//! A Gaussian-Mixture Probability Hypothesis Density (GM-PHD) filter that
//! tracks an unknown, time-varying number of targets from noisy point
//! observations, and turns the filtered intensity into persistent track
//! identities across a frame sequence.
//!
//! # Features
//!
//! - **Type Safety**: State, measurement and innovation spaces are distinct types
//! - **Value Semantics**: Every stage builds a fresh mixture, nothing is aliased
//! - **Swappable Execution**: Serial correction by default, pooled with `parallel`
//! - **no_std Support**: Works without `std` (requires an allocator)
//!
//! # Pipeline
//!
//! ```text
//! predict (+ birth) -> update -> prune -> extract (+ identities)
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::string::String;

pub mod types;
pub mod models;
pub mod filters;
pub mod assignment;
pub mod utils;
pub mod tracking;
pub mod pipeline;

pub mod prelude {
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
    pub use crate::types::gaussian::*;
    pub use crate::types::identity::*;
    pub use crate::models::*;
    pub use crate::filters::phd::*;
    pub use crate::filters::executor::*;
    pub use crate::utils::*;
    pub use crate::tracking::*;
    pub use crate::pipeline::*;
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq)]
pub enum PhdError {
    /// Model parameters are invalid (fatal before the first frame)
    Configuration {
        /// What is wrong with the configuration
        reason: String,
    },
    /// Matrix is singular and cannot be inverted
    SingularMatrix {
        /// Which matrix failed
        context: &'static str,
    },
    /// Matrix is not symmetric positive definite
    NotPositiveDefinite {
        /// Which matrix failed
        context: &'static str,
    },
    /// Assignment algorithm could not be set up or solved
    AssignmentFailed,
}

impl PhdError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        PhdError::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns true for errors raised by the filter math during a frame.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            PhdError::SingularMatrix { .. } | PhdError::NotPositiveDefinite { .. }
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PhdError {}

impl ::core::fmt::Display for PhdError {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            PhdError::Configuration { reason } => write!(f, "Invalid configuration: {}", reason),
            PhdError::SingularMatrix { context } => write!(f, "Matrix is singular: {}", context),
            PhdError::NotPositiveDefinite { context } => {
                write!(f, "Matrix is not positive definite: {}", context)
            }
            PhdError::AssignmentFailed => write!(f, "Assignment algorithm failed"),
        }
    }
}

pub type Result<T> = ::core::result::Result<T, PhdError>;
