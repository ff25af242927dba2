//! Discrete PID response model.
//!
//! - `response`: vectorized evaluation over a whole trace (used by the fitter)
//! - `stream`: the same model as an incremental recurrence (used by the
//!   closed-loop simulator)

pub mod response;
pub mod stream;

pub use response::*;
pub use stream::*;
