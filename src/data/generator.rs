//! Synthetic trace generation.
//!
//! Every trace shares a fixed 100-sample, 10-second time base. Open-loop
//! scenarios build SP and PV from closed-form expressions and label OUT with
//! the surrogate `SP - PV + N(0, output_noise)`; this is an inverse-error
//! approximation, not a control law. The closed-loop scenario instead runs a
//! [`PidStream`] against a static plant, so its OUT is a real controller
//! output.
//!
//! Noise draws are made for every sample even when the standard deviation is
//! zero, so the random stream (and therefore the trace) depends only on the
//! seed and the scenario.

use std::f64::consts::PI;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::domain::{
    ClosedLoopKind, NonlinearKind, OscillatoryKind, PidGains, PlantModel, Scenario, ScenarioConfig, StableKind,
    StepKind, Trace,
};
use crate::error::PidResult;
use crate::math::linspace;
use crate::models::PidStream;

pub const TRACE_SAMPLES: usize = 100;
pub const TRACE_DURATION: f64 = 10.0;

const BASE_LEVEL: f64 = 50.0;
const PV_OSCILLATION_AMPLITUDE: f64 = 8.0;
const PV_OSCILLATION_HZ: f64 = 0.5;

/// The shared time base: 100 evenly spaced samples on `[0, 10]`.
pub fn time_base() -> Vec<f64> {
    linspace(0.0, TRACE_DURATION, TRACE_SAMPLES)
}

/// Generate one trace. Configuration is validated first; nothing is produced
/// on error.
pub fn generate(config: &ScenarioConfig) -> PidResult<Trace> {
    config.validate()?;

    let time = time_base();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let (sp, mut pv, mut out) = match config.scenario {
        Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator { gains, plant }) => {
            closed_loop(&time, gains, plant, config.noise_level, &mut rng)
        }
        scenario => {
            let sp = setpoint(scenario, &time, &mut rng);
            let mut pv = process_variable(scenario, &time, &sp, config.delay);
            add_noise(&mut pv, config.noise_level, &mut rng);
            let mut out: Vec<f64> = sp.iter().zip(&pv).map(|(s, p)| s - p).collect();
            add_noise(&mut out, config.output_noise, &mut rng);
            (sp, pv, out)
        }
    };

    if let Some(sat) = &config.saturation {
        sat.apply(&mut pv);
        sat.apply(&mut out);
    }

    log::debug!(
        "generated {} ({} samples, noise={}, delay={}, seed={})",
        config.scenario.label(),
        time.len(),
        config.noise_level,
        config.delay,
        config.seed
    );
    Trace::new(time, sp, pv, out)
}

fn setpoint(scenario: Scenario, time: &[f64], rng: &mut StdRng) -> Vec<f64> {
    match scenario {
        Scenario::Stable(StableKind::Constant)
        | Scenario::StepChange(StepKind::PvStepDisturbance { .. })
        | Scenario::Oscillatory(OscillatoryKind::PvOscillates)
        | Scenario::Nonlinear(_)
        | Scenario::ClosedLoop(_) => vec![BASE_LEVEL; time.len()],
        Scenario::Stable(StableKind::Drifting { omega }) => {
            time.iter().map(|t| BASE_LEVEL + 2.0 * (omega * t).sin()).collect()
        }
        Scenario::Stable(StableKind::RandomFluctuations) => time
            .iter()
            .map(|_| BASE_LEVEL + rng.sample::<f64, _>(StandardNormal))
            .collect(),
        Scenario::StepChange(StepKind::Single) => {
            time.iter().map(|&t| if t >= 5.0 { 60.0 } else { 40.0 }).collect()
        }
        Scenario::StepChange(StepKind::Multiple) => time
            .iter()
            .map(|&t| match t {
                t if t >= 8.0 => 55.0,
                t if t >= 6.0 => 65.0,
                t if t >= 3.0 => 50.0,
                _ => 40.0,
            })
            .collect(),
        Scenario::StepChange(StepKind::Ramp) => linspace(40.0, 60.0, time.len()),
        Scenario::Oscillatory(OscillatoryKind::SpOscillates) => time
            .iter()
            .map(|t| BASE_LEVEL + 5.0 * (2.0 * PI * 0.2 * t).sin())
            .collect(),
    }
}

/// PV before noise. `delay` holds PV at `SP[0]` for `t < delay`.
fn process_variable(scenario: Scenario, time: &[f64], sp: &[f64], delay: f64) -> Vec<f64> {
    let sp0 = sp[0];
    let delayed = |i: usize| if time[i] < delay { sp0 } else { sp[i] };

    (0..time.len())
        .map(|i| {
            let t = time[i];
            match scenario {
                Scenario::Stable(_) => sp[i],
                Scenario::StepChange(StepKind::PvStepDisturbance { magnitude, at }) => {
                    if t >= at { sp[i] - magnitude } else { sp[i] }
                }
                Scenario::StepChange(_) => delayed(i),
                Scenario::Oscillatory(_) => {
                    delayed(i) + PV_OSCILLATION_AMPLITUDE * (2.0 * PI * PV_OSCILLATION_HZ * t).sin()
                }
                Scenario::Nonlinear(NonlinearKind::SaturationResponse) => {
                    if t < delay { sp0 } else { sp0 + 10.0 * ((t - 5.0) / 2.0).tanh() }
                }
                // Built sample by sample in `closed_loop`.
                Scenario::ClosedLoop(_) => sp[i],
            }
        })
        .collect()
}

/// Run `gains` against `PV[i] = a SP[i] + b OUT[i-1] + noise`, `PV[0] = noise`.
fn closed_loop(
    time: &[f64],
    gains: PidGains,
    plant: PlantModel,
    noise_level: f64,
    rng: &mut StdRng,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let sp = vec![BASE_LEVEL; time.len()];
    let mut pv = Vec::with_capacity(time.len());
    let mut out: Vec<f64> = Vec::with_capacity(time.len());
    let mut controller = PidStream::new(gains);

    for (i, &t) in time.iter().enumerate() {
        let response = match out.last() {
            Some(&prev_out) => plant.setpoint_coupling * sp[i] + plant.output_coupling * prev_out,
            None => 0.0,
        };
        let value = response + noise_level * rng.sample::<f64, _>(StandardNormal);
        pv.push(value);
        out.push(controller.update(t, sp[i], value));
    }
    (sp, pv, out)
}

fn add_noise(values: &mut [f64], std_dev: f64, rng: &mut StdRng) {
    for v in values.iter_mut() {
        *v += std_dev * rng.sample::<f64, _>(StandardNormal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_REGULATOR_GAINS, DerivativeScheme};
    use crate::models::simulate_output;
    use proptest::prelude::*;

    fn quiet(scenario: Scenario) -> ScenarioConfig {
        ScenarioConfig::new(scenario).with_output_noise(0.0)
    }

    #[test]
    fn step_single_without_delay_or_noise() {
        let trace = generate(&ScenarioConfig::new(Scenario::StepChange(StepKind::Single))).unwrap();
        assert_eq!(trace.len(), TRACE_SAMPLES);
        for i in 0..trace.len() {
            let expected = if trace.time()[i] < 5.0 { 40.0 } else { 60.0 };
            assert_eq!(trace.sp()[i], expected);
            assert_eq!(trace.pv()[i], trace.sp()[i]);
        }
    }

    #[test]
    fn stable_constant_is_flat() {
        let trace = generate(&ScenarioConfig::new(Scenario::Stable(StableKind::Constant))).unwrap();
        assert_eq!(trace.len(), 100);
        assert!(trace.sp().iter().all(|&v| v == 50.0));
        assert!(trace.pv().iter().all(|&v| v == 50.0));
    }

    #[test]
    fn delay_holds_pv_at_initial_setpoint() {
        let config = quiet(Scenario::StepChange(StepKind::Single)).with_delay(6.5);
        let trace = generate(&config).unwrap();
        for i in 0..trace.len() {
            let t = trace.time()[i];
            let expected = if t < 6.5 { 40.0 } else { 60.0 };
            assert_eq!(trace.pv()[i], expected, "t={t}");
            assert_eq!(trace.out()[i], trace.sp()[i] - trace.pv()[i]);
        }
    }

    #[test]
    fn multiple_steps_follow_schedule() {
        let trace = generate(&quiet(Scenario::StepChange(StepKind::Multiple))).unwrap();
        for (&t, &sp) in trace.time().iter().zip(trace.sp()) {
            let expected = if t >= 8.0 {
                55.0
            } else if t >= 6.0 {
                65.0
            } else if t >= 3.0 {
                50.0
            } else {
                40.0
            };
            assert_eq!(sp, expected);
        }
    }

    #[test]
    fn ramp_runs_from_40_to_60() {
        let trace = generate(&quiet(Scenario::StepChange(StepKind::Ramp))).unwrap();
        assert_eq!(trace.sp()[0], 40.0);
        assert_eq!(trace.sp()[99], 60.0);
    }

    #[test]
    fn disturbance_drops_pv_but_not_sp() {
        let scenario = Scenario::StepChange(StepKind::PvStepDisturbance { magnitude: 5.0, at: 5.0 });
        let trace = generate(&quiet(scenario)).unwrap();
        assert!(trace.sp().iter().all(|&v| v == 50.0));
        for (&t, &pv) in trace.time().iter().zip(trace.pv()) {
            assert_eq!(pv, if t >= 5.0 { 45.0 } else { 50.0 });
        }
    }

    #[test]
    fn drifting_uses_configured_omega() {
        let trace = generate(&quiet(Scenario::Stable(StableKind::Drifting { omega: 0.2 }))).unwrap();
        for (&t, &sp) in trace.time().iter().zip(trace.sp()) {
            assert!((sp - (50.0 + 2.0 * (0.2 * t).sin())).abs() < 1e-12);
        }
    }

    #[test]
    fn pv_oscillation_is_superimposed() {
        let trace = generate(&quiet(Scenario::Oscillatory(OscillatoryKind::PvOscillates))).unwrap();
        for (&t, &pv) in trace.time().iter().zip(trace.pv()) {
            assert!((pv - (50.0 + 8.0 * (PI * t).sin())).abs() < 1e-12);
        }
    }

    #[test]
    fn saturation_response_follows_tanh() {
        let trace = generate(&quiet(Scenario::Nonlinear(NonlinearKind::SaturationResponse))).unwrap();
        let mid = trace.time().iter().position(|&t| t >= 5.0).unwrap();
        assert!((trace.pv()[0] - (50.0 + 10.0 * (-2.5f64).tanh())).abs() < 1e-12);
        assert!(trace.pv()[mid] > 50.0);
        assert!(trace.pv().iter().all(|&v| v > 40.0 && v < 60.0));
    }

    #[test]
    fn saturation_clamps_pv_and_out_last() {
        let config = ScenarioConfig::new(Scenario::Oscillatory(OscillatoryKind::SpOscillates))
            .with_noise(1.0)
            .with_saturation(45.0, 55.0)
            .unwrap();
        let trace = generate(&config).unwrap();
        assert!(trace.pv().iter().all(|&v| (45.0..=55.0).contains(&v)));
        assert!(trace.out().iter().all(|&v| (45.0..=55.0).contains(&v)));
    }

    #[test]
    fn same_seed_same_trace() {
        let config = ScenarioConfig::new(Scenario::Stable(StableKind::RandomFluctuations))
            .with_noise(0.5)
            .with_seed(7);
        assert_eq!(generate(&config).unwrap(), generate(&config).unwrap());
        let other = generate(&config.clone().with_seed(8)).unwrap();
        assert_ne!(generate(&config).unwrap(), other);
    }

    #[test]
    fn closed_loop_output_is_reproduced_by_the_model() {
        let scenario = Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator {
            gains: DEFAULT_REGULATOR_GAINS,
            plant: PlantModel::default(),
        });
        let trace = generate(&ScenarioConfig::new(scenario)).unwrap();
        assert_eq!(trace.pv()[0], 0.0);
        assert_eq!(trace.pv()[1], 0.8 * 50.0 + 0.2 * trace.out()[0]);

        let predicted = simulate_output(
            &DEFAULT_REGULATOR_GAINS,
            trace.sp(),
            trace.pv(),
            trace.time(),
            DerivativeScheme::Backward,
        )
        .unwrap();
        assert_eq!(predicted, trace.out());
    }

    fn mean_and_std(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, var.sqrt())
    }

    /// Pool 20 seeds (2000 samples) so the estimates are tight.
    fn pooled(config: ScenarioConfig, channel: impl Fn(&Trace) -> Vec<f64>) -> Vec<f64> {
        (0..20)
            .flat_map(|seed| channel(&generate(&config.clone().with_seed(seed)).unwrap()))
            .collect()
    }

    #[test]
    fn pv_noise_has_requested_standard_deviation() {
        let config = ScenarioConfig::new(Scenario::Stable(StableKind::Constant))
            .with_noise(2.0)
            .with_output_noise(0.0);
        let deviations = pooled(config.clone(), |t| t.pv().iter().map(|pv| pv - 50.0).collect());
        let (mean, std) = mean_and_std(&deviations);
        assert!(mean.abs() < 0.25, "mean={mean}");
        assert!((std - 2.0).abs() < 0.2, "std={std}");

        // Without output noise OUT is exactly the error surrogate.
        let trace = generate(&config).unwrap();
        for i in 0..trace.len() {
            assert_eq!(trace.out()[i], trace.sp()[i] - trace.pv()[i]);
        }
    }

    #[test]
    fn output_noise_only_touches_out() {
        let config = ScenarioConfig::new(Scenario::Stable(StableKind::Constant)).with_output_noise(1.5);
        let trace = generate(&config).unwrap();
        assert!(trace.pv().iter().all(|&v| v == 50.0));

        let out = pooled(config, |t| t.out().to_vec());
        let (mean, std) = mean_and_std(&out);
        assert!(mean.abs() < 0.2, "mean={mean}");
        assert!((std - 1.5).abs() < 0.15, "std={std}");
    }

    #[test]
    fn sp_oscillation_follows_formula() {
        let trace = generate(&quiet(Scenario::Oscillatory(OscillatoryKind::SpOscillates))).unwrap();
        for i in 0..trace.len() {
            let t = trace.time()[i];
            let sp = 50.0 + 5.0 * (2.0 * PI * 0.2 * t).sin();
            assert!((trace.sp()[i] - sp).abs() < 1e-12, "t={t}");
            assert!((trace.pv()[i] - (sp + 8.0 * (PI * t).sin())).abs() < 1e-12, "t={t}");
        }
    }

    #[test]
    fn delay_applies_to_multiple_steps_and_ramp() {
        for kind in [StepKind::Multiple, StepKind::Ramp] {
            let trace = generate(&quiet(Scenario::StepChange(kind)).with_delay(4.0)).unwrap();
            for i in 0..trace.len() {
                let expected = if trace.time()[i] < 4.0 { 40.0 } else { trace.sp()[i] };
                assert_eq!(trace.pv()[i], expected, "{kind:?} t={}", trace.time()[i]);
            }
        }
    }

    #[test]
    fn invalid_config_produces_nothing() {
        let config = ScenarioConfig::new(Scenario::Stable(StableKind::Constant)).with_noise(-1.0);
        assert!(generate(&config).is_err());
    }

    fn any_scenario() -> impl Strategy<Value = Scenario> {
        proptest::sample::select(Scenario::NAMES.to_vec()).prop_map(|name| name.parse::<Scenario>().unwrap())
    }

    proptest! {
        #[test]
        fn every_trace_is_well_formed(
            scenario in any_scenario(),
            noise in 0.0f64..3.0,
            delay in 0.0f64..10.0,
            seed in any::<u64>(),
        ) {
            let config = ScenarioConfig::new(scenario).with_noise(noise).with_delay(delay).with_seed(seed);
            let trace = generate(&config).unwrap();
            prop_assert_eq!(trace.len(), TRACE_SAMPLES);
            prop_assert_eq!(trace.sp().len(), trace.time().len());
            prop_assert_eq!(trace.pv().len(), trace.time().len());
            prop_assert_eq!(trace.out().len(), trace.time().len());
            prop_assert!(trace.time().windows(2).all(|w| w[0] < w[1]));
        }
    }
}
