//! Core types for the GM-PHD filter
//!
//! Typed vectors and matrices, Gaussian components and mixtures, identities
//! and filter phase markers.

pub mod gaussian;
pub mod identity;
pub mod phase;
pub mod spaces;
pub mod transforms;
