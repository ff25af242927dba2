//! Mathematical utilities: discrete calculus, linear least squares and the
//! simplex minimizer.

pub mod calculus;
pub mod nelder_mead;
pub mod ols;

pub use calculus::*;
pub use nelder_mead::*;
pub use ols::*;
