//! Discrete calculus on sampled signals with an arbitrary (strictly
//! increasing) time base.
//!
//! The time-based helpers expect `time.len() == values.len()`; callers
//! validate that first (see [`Regressors`](crate::models::Regressors)).

/// Rectangular running integral: `out[0] = 0`, `out[i] = out[i-1] + v[i] * (t[i] - t[i-1])`.
pub(crate) fn cumulative_integral(values: &[f64], time: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for i in 0..values.len() {
        if i > 0 {
            acc += values[i] * (time[i] - time[i - 1]);
        }
        out.push(acc);
    }
    out
}

/// Numerical gradient `dv/dt`.
///
/// Interior points use the second-order central difference for non-uniform
/// spacing; the end points use first-order one-sided differences. A single
/// sample has gradient 0.
pub(crate) fn gradient(values: &[f64], time: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = vec![0.0; n];
    out[0] = (values[1] - values[0]) / (time[1] - time[0]);
    out[n - 1] = (values[n - 1] - values[n - 2]) / (time[n - 1] - time[n - 2]);

    for i in 1..n - 1 {
        let h_l = time[i] - time[i - 1];
        let h_r = time[i + 1] - time[i];
        let a = -h_r / (h_l * (h_l + h_r));
        let b = (h_r - h_l) / (h_l * h_r);
        let c = h_l / (h_r * (h_l + h_r));
        out[i] = a * values[i - 1] + b * values[i] + c * values[i + 1];
    }
    out
}

/// Per-sample backward difference `v[i] - v[i-1]`, with `out[0] = 0`.
pub fn backward_difference(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        out.push(if i == 0 { 0.0 } else { values[i] - values[i - 1] });
    }
    out
}

/// `steps` evenly spaced points on `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (steps as f64 - 1.0);
            (0..steps)
                .map(|i| if i == steps - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}
