//! Vectorized PID response.
//!
//! ```text
//! e[i] = SP[i] - PV[i]
//! I[0] = 0,  I[i] = I[i-1] + e[i] * (t[i] - t[i-1])
//! D[i] = de/dt (gradient) or e[i] - e[i-1] (backward)
//! OUT[i] = Kp e[i] + Ki I[i] + Kd D[i]
//! ```
//!
//! The output is linear in the gains, so the three regressor channels are
//! computed once per trace and every candidate evaluation is a single
//! weighted sum.

use crate::domain::{DerivativeScheme, PidGains, Trace};
use crate::error::{PidError, PidResult};
use crate::math::{backward_difference, cumulative_integral, gradient};

/// Error, integral and derivative channels of a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Regressors {
    pub error: Vec<f64>,
    pub integral: Vec<f64>,
    pub derivative: Vec<f64>,
}

impl Regressors {
    /// Build from raw channels. Lengths must match; `time` must be strictly
    /// increasing.
    pub fn from_channels(sp: &[f64], pv: &[f64], time: &[f64], scheme: DerivativeScheme) -> PidResult<Self> {
        if sp.len() != time.len() || pv.len() != time.len() {
            return Err(PidError::config(format!(
                "Channel lengths differ: time={}, SP={}, PV={}",
                time.len(),
                sp.len(),
                pv.len()
            )));
        }
        if time.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PidError::config("Time base must be strictly increasing."));
        }
        Ok(Self::compute(sp, pv, time, scheme))
    }

    /// Build from a validated trace.
    pub fn from_trace(trace: &Trace, scheme: DerivativeScheme) -> Self {
        Self::compute(trace.sp(), trace.pv(), trace.time(), scheme)
    }

    fn compute(sp: &[f64], pv: &[f64], time: &[f64], scheme: DerivativeScheme) -> Self {
        let error: Vec<f64> = sp.iter().zip(pv).map(|(s, p)| s - p).collect();
        let integral = cumulative_integral(&error, time);
        let derivative = match scheme {
            DerivativeScheme::Gradient => gradient(&error, time),
            DerivativeScheme::Backward => backward_difference(&error),
        };
        Self {
            error,
            integral,
            derivative,
        }
    }

    pub fn len(&self) -> usize {
        self.error.len()
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_empty()
    }

    /// Model output at sample `i`.
    pub fn output_at(&self, i: usize, gains: &PidGains) -> f64 {
        gains.kp * self.error[i] + gains.ki * self.integral[i] + gains.kd * self.derivative[i]
    }

    /// Model output for the whole trace.
    pub fn output(&self, gains: &PidGains) -> Vec<f64> {
        (0..self.len()).map(|i| self.output_at(i, gains)).collect()
    }
}

/// Predicted controller output for `gains` given SP, PV and time.
pub fn simulate_output(
    gains: &PidGains,
    sp: &[f64],
    pv: &[f64],
    time: &[f64],
    scheme: DerivativeScheme,
) -> PidResult<Vec<f64>> {
    Ok(Regressors::from_channels(sp, pv, time, scheme)?.output(gains))
}

/// Copy of `trace` whose OUT channel is the model response to `gains`.
///
/// This is how noise-free "ground truth" datasets with known gains are made.
pub fn synthesize_output(trace: &Trace, gains: &PidGains, scheme: DerivativeScheme) -> PidResult<Trace> {
    let out = Regressors::from_trace(trace, scheme).output(gains);
    trace.with_out(out)
}
