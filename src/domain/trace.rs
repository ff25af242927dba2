//! The trace container: equal-length `time`, `SP`, `PV`, `OUT` channels.
//!
//! A [`Trace`] can only be built through [`Trace::new`], which checks the
//! invariants every consumer relies on:
//!
//! - all channels have the same, non-zero length
//! - all samples are finite
//! - `time` is strictly increasing (uniform spacing is *not* required)

use crate::error::{PidError, PidResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    time: Vec<f64>,
    sp: Vec<f64>,
    pv: Vec<f64>,
    out: Vec<f64>,
}

/// Summary stats about a trace's time base and channels.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStats {
    pub n_samples: usize,
    pub t_min: f64,
    pub t_max: f64,
    pub mean_dt: f64,
    /// All intervals within 1e-9 relative of the mean interval.
    pub uniform: bool,
    pub pv_min: f64,
    pub pv_max: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl Trace {
    pub fn new(time: Vec<f64>, sp: Vec<f64>, pv: Vec<f64>, out: Vec<f64>) -> PidResult<Self> {
        let n = time.len();
        if n == 0 {
            return Err(PidError::config("Trace must contain at least one sample."));
        }
        for (name, channel) in [("SP", &sp), ("PV", &pv), ("OUT", &out)] {
            if channel.len() != n {
                return Err(PidError::config(format!(
                    "Channel {name} has {} samples but time has {n}.",
                    channel.len()
                )));
            }
        }
        for (name, channel) in [("time", &time), ("SP", &sp), ("PV", &pv), ("OUT", &out)] {
            if let Some(i) = channel.iter().position(|v| !v.is_finite()) {
                return Err(PidError::config(format!("Channel {name} has a non-finite value at sample {i}.")));
            }
        }
        if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(PidError::config(format!(
                "Time must be strictly increasing (time[{}]={} >= time[{}]={}).",
                i,
                time[i],
                i + 1,
                time[i + 1]
            )));
        }
        Ok(Self { time, sp, pv, out })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn sp(&self) -> &[f64] {
        &self.sp
    }

    pub fn pv(&self) -> &[f64] {
        &self.pv
    }

    pub fn out(&self) -> &[f64] {
        &self.out
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Copy of this trace with the `OUT` channel replaced.
    pub fn with_out(&self, out: Vec<f64>) -> PidResult<Trace> {
        Trace::new(self.time.clone(), self.sp.clone(), self.pv.clone(), out)
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        (self.time, self.sp, self.pv, self.out)
    }

    pub fn stats(&self) -> TraceStats {
        let n = self.len();
        let t_min = self.time[0];
        let t_max = self.time[n - 1];
        let mean_dt = if n > 1 { (t_max - t_min) / (n as f64 - 1.0) } else { 0.0 };
        let uniform = n < 3
            || self
                .time
                .windows(2)
                .all(|w| ((w[1] - w[0]) - mean_dt).abs() <= 1e-9 * mean_dt.abs().max(1e-300));

        let (pv_min, pv_max) = min_max(&self.pv);
        let (out_min, out_max) = min_max(&self.out);
        TraceStats {
            n_samples: n,
            t_min,
            t_max,
            mean_dt,
            uniform,
            pv_min,
            pv_max,
            out_min,
            out_max,
        }
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
