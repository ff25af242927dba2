//! Synthetic data.
//!
//! - `generator`: labeled process-response traces for each scenario family
//! - `saturation`: the signal clamp shared by the generator and post-processing

pub mod generator;
pub mod saturation;

pub use generator::{TRACE_DURATION, TRACE_SAMPLES, generate, time_base};
pub use saturation::{Saturation, clamp_signal};
