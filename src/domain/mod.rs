//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - gains, controller order, loss/derivative/solver choices (`types`)
//! - the immutable trace container (`trace`)
//! - scenario selection for the generator (`scenario`)
//! - JSON-safe encoding of non-finite floats (`non_finite`)

pub mod non_finite;
pub mod scenario;
pub mod trace;
pub mod types;

pub use scenario::*;
pub use trace::*;
pub use types::*;
