//! Linear least squares solver.
//!
//! The PID response is linear in the gains once the error, its integral and its
//! derivative are fixed:
//!
//! ```text
//! minimize Σ (OUT_i - [e_i, I_i, D_i] · [Kp, Ki, Kd])^2
//! ```
//!
//! so the optimum can be computed directly. We solve it with SVD, which copes
//! with tall design matrices and with rank deficiency (e.g. a trace whose
//! error channel is identically zero).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if no tolerance yields a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
