//! Reporting utilities: fitted output, residuals, and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{DerivativeScheme, FitResult, Trace};
use crate::models::Regressors;

/// Model output and residuals of a fit over its trace.
#[derive(Debug, Clone)]
pub struct Residuals {
    pub predicted: Vec<f64>,
    /// `observed - predicted` per sample.
    pub residuals: Vec<f64>,
    pub rmse: f64,
    pub max_abs: f64,
}

/// Compute fitted output and residuals for each sample.
///
/// Gains far enough from the data can overflow the model output. The
/// residuals are still returned, with `rmse` and `max_abs` set to `+inf`, so
/// the fit that produced them is not lost.
pub fn compute_residuals(trace: &Trace, fit: &FitResult, scheme: DerivativeScheme) -> Residuals {
    let predicted = Regressors::from_trace(trace, scheme).output(&fit.gains);
    let residuals: Vec<f64> = trace.out().iter().zip(&predicted).map(|(y, p)| y - p).collect();

    if residuals.iter().any(|r| !r.is_finite()) {
        log::warn!("model output is not finite for {}; residuals are unbounded", fit.gains);
        return Residuals {
            predicted,
            residuals,
            rmse: f64::INFINITY,
            max_abs: f64::INFINITY,
        };
    }

    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let rmse = (sse / residuals.len() as f64).sqrt();
    let max_abs = residuals.iter().fold(0.0, |m: f64, r| m.max(r.abs()));
    Residuals {
        predicted,
        residuals,
        rmse,
        max_abs,
    }
}
