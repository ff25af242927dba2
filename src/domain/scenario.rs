//! Scenario selection for the synthetic trace generator.
//!
//! Each behavior family is a closed enum whose variants carry only the
//! parameters that make sense for them, so an invalid behavior/subtype pair
//! cannot be constructed. Free text (CLI input) is parsed once at the boundary
//! via [`std::str::FromStr`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::Saturation;
use crate::domain::PidGains;
use crate::error::{PidError, PidResult};

/// Angular frequency (rad/s) of the `stable/drifting` setpoint.
pub const DEFAULT_DRIFT_OMEGA: f64 = 0.1;
/// Size of the PV drop in `step/disturbance`.
pub const DEFAULT_DISTURBANCE_MAGNITUDE: f64 = 5.0;
/// Time (s) at which the `step/disturbance` PV drop occurs.
pub const DEFAULT_DISTURBANCE_TIME: f64 = 5.0;
/// Standard deviation of the noise added to the synthetic OUT surrogate.
pub const DEFAULT_OUTPUT_NOISE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "behavior", content = "subtype", rename_all = "kebab-case")]
pub enum Scenario {
    Stable(StableKind),
    StepChange(StepKind),
    Oscillatory(OscillatoryKind),
    Nonlinear(NonlinearKind),
    ClosedLoop(ClosedLoopKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StableKind {
    Constant,
    /// `SP = 50 + 2 sin(omega t)`.
    Drifting { omega: f64 },
    RandomFluctuations,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Single,
    Multiple,
    Ramp,
    /// Load disturbance on PV with the setpoint held constant.
    PvStepDisturbance { magnitude: f64, at: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OscillatoryKind {
    SpOscillates,
    PvOscillates,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonlinearKind {
    SaturationResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosedLoopKind {
    /// A PID loop closed around a static first-order plant.
    PressureRegulator { gains: PidGains, plant: PlantModel },
}

/// Static plant `PV[i] = setpoint_coupling * SP[i] + output_coupling * OUT[i-1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantModel {
    pub setpoint_coupling: f64,
    pub output_coupling: f64,
}

impl Default for PlantModel {
    fn default() -> Self {
        Self {
            setpoint_coupling: 0.8,
            output_coupling: 0.2,
        }
    }
}

/// Gains of the simulated pressure regulator.
pub const DEFAULT_REGULATOR_GAINS: PidGains = PidGains::new(1.5, 0.1, 0.05);

impl Scenario {
    /// Every accepted `behavior/subtype` spelling, canonical form.
    pub const NAMES: [&'static str; 11] = [
        "stable/constant",
        "stable/drifting",
        "stable/random",
        "step/single",
        "step/multiple",
        "step/ramp",
        "step/disturbance",
        "oscillatory/sp",
        "oscillatory/pv",
        "nonlinear/saturation",
        "closed-loop/pressure",
    ];

    /// Canonical `behavior/subtype` label.
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Stable(StableKind::Constant) => "stable/constant",
            Scenario::Stable(StableKind::Drifting { .. }) => "stable/drifting",
            Scenario::Stable(StableKind::RandomFluctuations) => "stable/random",
            Scenario::StepChange(StepKind::Single) => "step/single",
            Scenario::StepChange(StepKind::Multiple) => "step/multiple",
            Scenario::StepChange(StepKind::Ramp) => "step/ramp",
            Scenario::StepChange(StepKind::PvStepDisturbance { .. }) => "step/disturbance",
            Scenario::Oscillatory(OscillatoryKind::SpOscillates) => "oscillatory/sp",
            Scenario::Oscillatory(OscillatoryKind::PvOscillates) => "oscillatory/pv",
            Scenario::Nonlinear(NonlinearKind::SaturationResponse) => "nonlinear/saturation",
            Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator { .. }) => "closed-loop/pressure",
        }
    }

    /// Whether the deadtime rule shapes PV for this scenario.
    pub fn uses_delay(&self) -> bool {
        matches!(
            self,
            Scenario::StepChange(StepKind::Single | StepKind::Multiple | StepKind::Ramp)
                | Scenario::Oscillatory(_)
                | Scenario::Nonlinear(_)
        )
    }

    /// Whether OUT is the noisy `SP - PV` surrogate (every open-loop scenario).
    pub fn uses_output_noise(&self) -> bool {
        !matches!(self, Scenario::ClosedLoop(_))
    }

    /// Check variant parameters.
    pub fn validate(&self) -> PidResult<()> {
        match *self {
            Scenario::Stable(StableKind::Drifting { omega }) => {
                finite("drift omega", omega)?;
            }
            Scenario::StepChange(StepKind::PvStepDisturbance { magnitude, at }) => {
                finite("disturbance magnitude", magnitude)?;
                finite("disturbance time", at)?;
            }
            Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator { gains, plant }) => {
                if !gains.is_finite() {
                    return Err(PidError::config("Regulator gains must be finite."));
                }
                finite("plant setpoint coupling", plant.setpoint_coupling)?;
                finite("plant output coupling", plant.output_coupling)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn finite(what: &str, value: f64) -> PidResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PidError::config(format!("{what} must be finite, got {value}")))
    }
}

fn normalize_token(token: &str) -> String {
    token
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Scenario {
    type Err = PidError;

    /// Parse `behavior/subtype` (also `behavior:subtype`).
    ///
    /// Matching ignores case, `-`, `_` and spaces, and accepts the long names
    /// (`StepChange/PVStepDisturbance`) as well as the short ones
    /// (`step/disturbance`). Parameterized variants get their defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (behavior, subtype) = s
            .split_once(['/', ':'])
            .ok_or_else(|| PidError::config(format!("Scenario `{s}` must look like `behavior/subtype`.")))?;
        let behavior = normalize_token(behavior);
        let subtype = normalize_token(subtype);

        let scenario = match behavior.as_str() {
            "stable" => match subtype.as_str() {
                "constant" => Scenario::Stable(StableKind::Constant),
                "drifting" | "drift" => Scenario::Stable(StableKind::Drifting {
                    omega: DEFAULT_DRIFT_OMEGA,
                }),
                "random" | "randomfluctuations" => Scenario::Stable(StableKind::RandomFluctuations),
                _ => return Err(unknown_subtype("stable", &subtype)),
            },
            "step" | "stepchange" => match subtype.as_str() {
                "single" => Scenario::StepChange(StepKind::Single),
                "multiple" => Scenario::StepChange(StepKind::Multiple),
                "ramp" => Scenario::StepChange(StepKind::Ramp),
                "disturbance" | "pvstepdisturbance" | "pvstep" => {
                    Scenario::StepChange(StepKind::PvStepDisturbance {
                        magnitude: DEFAULT_DISTURBANCE_MAGNITUDE,
                        at: DEFAULT_DISTURBANCE_TIME,
                    })
                }
                _ => return Err(unknown_subtype("step", &subtype)),
            },
            "oscillatory" | "osc" => match subtype.as_str() {
                "sp" | "sposcillates" => Scenario::Oscillatory(OscillatoryKind::SpOscillates),
                "pv" | "pvoscillates" => Scenario::Oscillatory(OscillatoryKind::PvOscillates),
                _ => return Err(unknown_subtype("oscillatory", &subtype)),
            },
            "nonlinear" => match subtype.as_str() {
                "saturation" | "saturationresponse" => Scenario::Nonlinear(NonlinearKind::SaturationResponse),
                _ => return Err(unknown_subtype("nonlinear", &subtype)),
            },
            "closedloop" => match subtype.as_str() {
                "pressure" | "pressureregulator" => Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator {
                    gains: DEFAULT_REGULATOR_GAINS,
                    plant: PlantModel::default(),
                }),
                _ => return Err(unknown_subtype("closed-loop", &subtype)),
            },
            _ => {
                return Err(PidError::config(format!(
                    "Unknown behavior `{behavior}`; expected one of: {}",
                    Scenario::NAMES.join(", ")
                )));
            }
        };
        Ok(scenario)
    }
}

fn unknown_subtype(behavior: &str, subtype: &str) -> PidError {
    let prefix = format!("{behavior}/");
    let valid: Vec<&str> = Scenario::NAMES
        .iter()
        .copied()
        .filter(|n| n.starts_with(&prefix))
        .collect();
    PidError::config(format!(
        "Unknown subtype `{subtype}` for behavior `{behavior}`; expected one of: {}",
        valid.join(", ")
    ))
}

/// Everything the generator needs for one trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenario: Scenario,
    /// Standard deviation of the Gaussian noise added to PV.
    pub noise_level: f64,
    /// Deadtime (s) before PV follows the setpoint.
    pub delay: f64,
    /// Optional clamp applied to PV and OUT as the last step.
    pub saturation: Option<Saturation>,
    /// Standard deviation of the noise on the synthetic OUT surrogate.
    pub output_noise: f64,
    pub seed: u64,
}

impl ScenarioConfig {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            noise_level: 0.0,
            delay: 0.0,
            saturation: None,
            output_noise: DEFAULT_OUTPUT_NOISE,
            seed: 0,
        }
    }

    pub fn with_noise(mut self, noise_level: f64) -> Self {
        self.noise_level = noise_level;
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_output_noise(mut self, output_noise: f64) -> Self {
        self.output_noise = output_noise;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_saturation(mut self, min_out: f64, max_out: f64) -> PidResult<Self> {
        self.saturation = Some(Saturation::new(min_out, max_out)?);
        Ok(self)
    }

    pub fn validate(&self) -> PidResult<()> {
        if !(self.noise_level.is_finite() && self.noise_level >= 0.0) {
            return Err(PidError::config(format!("noise_level must be >= 0, got {}", self.noise_level)));
        }
        if !(self.delay.is_finite() && self.delay >= 0.0) {
            return Err(PidError::config(format!("delay must be >= 0, got {}", self.delay)));
        }
        if !(self.output_noise.is_finite() && self.output_noise >= 0.0) {
            return Err(PidError::config(format!("output_noise must be >= 0, got {}", self.output_noise)));
        }
        if let Some(sat) = &self.saturation {
            sat.validate()?;
        }
        self.scenario.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_canonical_name_round_trips_through_label() {
        for name in Scenario::NAMES {
            let scenario: Scenario = name.parse().unwrap();
            assert_eq!(scenario.label(), name);
        }
    }

    #[test]
    fn long_names_are_accepted() {
        let s: Scenario = "StepChange/PVStepDisturbance".parse().unwrap();
        assert!(matches!(s, Scenario::StepChange(StepKind::PvStepDisturbance { .. })));
        let s: Scenario = "Stable:RandomFluctuations".parse().unwrap();
        assert_eq!(s, Scenario::Stable(StableKind::RandomFluctuations));
        let s: Scenario = "Oscillatory/SP_Oscillates".parse().unwrap();
        assert_eq!(s, Scenario::Oscillatory(OscillatoryKind::SpOscillates));
    }

    #[test]
    fn delay_and_output_noise_applicability() {
        let names_using_delay: Vec<&str> = Scenario::NAMES
            .iter()
            .copied()
            .filter(|n| n.parse::<Scenario>().unwrap().uses_delay())
            .collect();
        assert_eq!(
            names_using_delay,
            vec![
                "step/single",
                "step/multiple",
                "step/ramp",
                "oscillatory/sp",
                "oscillatory/pv",
                "nonlinear/saturation"
            ]
        );
        let closed: Scenario = "closed-loop/pressure".parse().unwrap();
        assert!(!closed.uses_output_noise());
        assert!(Scenario::Stable(StableKind::Constant).uses_output_noise());
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        for bad in ["chaotic/constant", "stable/bogus", "step", "nonlinear/ramp"] {
            let err = bad.parse::<Scenario>().unwrap_err();
            assert!(matches!(err, PidError::Configuration(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let base = ScenarioConfig::new(Scenario::StepChange(StepKind::Single));
        assert!(base.clone().with_noise(-0.1).validate().is_err());
        assert!(base.clone().with_delay(-1.0).validate().is_err());
        assert!(base.clone().with_output_noise(f64::NAN).validate().is_err());
        assert!(base.clone().with_saturation(5.0, 1.0).is_err());
        assert!(base.validate().is_ok());

        let drifting = ScenarioConfig::new(Scenario::Stable(StableKind::Drifting { omega: f64::INFINITY }));
        assert!(drifting.validate().is_err());
    }
}
