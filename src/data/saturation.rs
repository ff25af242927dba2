//! Output saturation: elementwise clamp to `[min_out, max_out]`.

use serde::{Deserialize, Serialize};

use crate::error::{PidError, PidResult};

/// Physical signal limits. Always satisfies `min_out <= max_out`, including
/// when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SaturationBounds")]
pub struct Saturation {
    min_out: f64,
    max_out: f64,
}

/// Unchecked wire form of [`Saturation`].
#[derive(Deserialize)]
struct SaturationBounds {
    min_out: f64,
    max_out: f64,
}

impl TryFrom<SaturationBounds> for Saturation {
    type Error = PidError;

    fn try_from(b: SaturationBounds) -> PidResult<Self> {
        Saturation::new(b.min_out, b.max_out)
    }
}

impl Saturation {
    pub fn new(min_out: f64, max_out: f64) -> PidResult<Self> {
        let s = Self { min_out, max_out };
        s.validate()?;
        Ok(s)
    }

    pub fn min_out(&self) -> f64 {
        self.min_out
    }

    pub fn max_out(&self) -> f64 {
        self.max_out
    }

    pub fn validate(&self) -> PidResult<()> {
        if self.min_out.is_nan() || self.max_out.is_nan() {
            return Err(PidError::config("Saturation bounds must not be NaN."));
        }
        if self.min_out > self.max_out {
            return Err(PidError::config(format!(
                "Saturation bounds inverted: min_out={} > max_out={}",
                self.min_out, self.max_out
            )));
        }
        Ok(())
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_out, self.max_out)
    }

    /// Clamp in place.
    pub fn apply(&self, values: &mut [f64]) {
        for v in values.iter_mut() {
            *v = self.clamp(*v);
        }
    }
}

/// Clamp a signal into a new vector, validating the bounds first.
pub fn clamp_signal(values: &[f64], min_out: f64, max_out: f64) -> PidResult<Vec<f64>> {
    let sat = Saturation::new(min_out, max_out)?;
    Ok(values.iter().map(|&v| sat.clamp(v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_both_sides() {
        let out = clamp_signal(&[-5.0, 0.5, 12.0], 0.0, 10.0).unwrap();
        assert_eq!(out, vec![0.0, 0.5, 10.0]);
    }

    #[test]
    fn inverted_bounds_are_a_configuration_error() {
        assert!(matches!(Saturation::new(10.0, 0.0), Err(PidError::Configuration(_))));
        assert!(Saturation::new(3.0, 3.0).is_ok());
    }

    #[test]
    fn inverted_bounds_cannot_be_deserialized() {
        let ok: Saturation = serde_json::from_str(r#"{"min_out":0.0,"max_out":10.0}"#).unwrap();
        assert_eq!((ok.min_out(), ok.max_out()), (0.0, 10.0));
        assert!(serde_json::from_str::<Saturation>(r#"{"min_out":10.0,"max_out":0.0}"#).is_err());
        assert_eq!(serde_json::to_value(ok).unwrap()["max_out"], 10.0);
    }

    #[test]
    fn apply_in_place_matches_clamp_signal() {
        let sat = Saturation::new(-1.0, 1.0).unwrap();
        let mut values = vec![-3.0, 0.25, 7.0];
        sat.apply(&mut values);
        assert_eq!(values, clamp_signal(&[-3.0, 0.25, 7.0], -1.0, 1.0).unwrap());
    }
}
