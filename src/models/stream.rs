//! Streaming form of the PID response model.
//!
//! [`PidStream`] keeps `(integral, previous error, previous time)` and
//! produces one output per sample. It uses the backward-difference derivative
//! and evaluates the same floating-point expressions, in the same order, as
//! [`Regressors`](crate::models::Regressors) with
//! [`DerivativeScheme::Backward`](crate::domain::DerivativeScheme), so the two
//! agree bit-for-bit.

use crate::domain::PidGains;

#[derive(Debug, Clone, PartialEq)]
pub struct PidStream {
    gains: PidGains,
    integral: f64,
    /// `(time, error)` of the previous sample.
    last: Option<(f64, f64)>,
}

impl PidStream {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last: None,
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last = None;
    }

    /// Feed one sample. `time` must be strictly greater than the previous one.
    pub fn update(&mut self, time: f64, sp: f64, pv: f64) -> f64 {
        let error = sp - pv;
        let derivative = match self.last {
            Some((prev_time, prev_error)) => {
                debug_assert!(time > prev_time, "time must be strictly increasing");
                self.integral += error * (time - prev_time);
                error - prev_error
            }
            None => 0.0,
        };
        self.last = Some((time, error));
        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}
