//! Gain identification.
//!
//! Responsibilities:
//!
//! - reduce model/observation residuals to a scalar loss
//! - drive the Nelder–Mead search (or the closed-form linear solve)
//! - multi-start over control-type presets (parallel) and pick the best fit

pub mod cancel;
pub mod fitter;
pub mod loss;
pub mod selection;

pub use cancel::*;
pub use fitter::*;
pub use loss::*;
pub use selection::*;
