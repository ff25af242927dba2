//! Formatted terminal output.
//!
//! Formatting lives in one place so the fitting code stays clean and output
//! changes are localized.

use crate::domain::{ControlType, FitResult, Scenario, ScenarioConfig, TraceStats};
use crate::fit::MultiStartFit;
use crate::report::Residuals;

/// Summary of a generated trace.
pub fn format_generate_summary(config: &ScenarioConfig, stats: &TraceStats) -> String {
    let mut out = String::new();
    out.push_str("=== pidfit - synthetic trace ===\n");
    out.push_str(&format!("Scenario: {}\n", config.scenario.label()));
    out.push_str(&format!(
        "Noise: {} | output noise: {} | delay: {} s | seed: {}\n",
        config.noise_level, config.output_noise, config.delay, config.seed
    ));
    if let Some(sat) = &config.saturation {
        out.push_str(&format!("Saturation: [{}, {}]\n", sat.min_out(), sat.max_out()));
    }
    out.push_str(&format_trace_stats(stats));
    out
}

/// One-line description of a trace's time base plus channel ranges.
pub fn format_trace_stats(stats: &TraceStats) -> String {
    format!(
        "Samples: n={} | t=[{:.3}, {:.3}] s | dt={:.4} s ({}) | PV=[{:.2}, {:.2}] | OUT=[{:.2}, {:.2}]\n",
        stats.n_samples,
        stats.t_min,
        stats.t_max,
        stats.mean_dt,
        if stats.uniform { "uniform" } else { "non-uniform" },
        stats.pv_min,
        stats.pv_max,
        stats.out_min,
        stats.out_max
    )
}

/// Full fit summary: data, optimizer diagnostics, gains.
pub fn format_fit_summary(
    stats: &TraceStats,
    guess: &[f64],
    fit: &FitResult,
    residuals: &Residuals,
    multistart: Option<&MultiStartFit>,
) -> String {
    let mut out = String::new();
    out.push_str("=== pidfit - PID gain estimation ===\n");
    out.push_str(&format_trace_stats(stats));
    out.push_str(&format!(
        "Order: {} | loss: {:?} | initial guess: {}\n",
        fit.order.display_name(),
        fit.loss_kind,
        fmt_vec(guess)
    ));

    if let Some(ms) = multistart {
        out.push_str("\nStart points:\n");
        for (idx, o) in ms.outcomes.iter().enumerate() {
            let chosen = if idx == ms.best_index { "*" } else { " " };
            out.push_str(&format!(
                "{chosen} {:<12} guess={:<28} loss={:.6e} converged={}\n",
                truncate(&o.start.label, 12),
                fmt_vec(&o.start.guess),
                o.result.loss,
                o.result.converged
            ));
        }
    }

    out.push_str("\nOptimizer:\n");
    out.push_str(&format!("- termination: {:?}\n", fit.termination));
    out.push_str(&format!("- converged  : {}\n", fit.converged));
    out.push_str(&format!(
        "- iterations : {} ({} evaluations)\n",
        fit.iterations, fit.evaluations
    ));
    out.push_str(&format!("- loss       : {:.6e}\n", fit.loss));
    out.push_str(&format!(
        "- residuals  : RMSE={:.6} max|r|={:.6}\n",
        residuals.rmse, residuals.max_abs
    ));

    out.push_str("\nGains:\n");
    out.push_str(&format!("- Kp = {:.6}\n", fit.gains.kp));
    out.push_str(&format!("- Ki = {:.6}\n", fit.gains.ki));
    out.push_str(&format!("- Kd = {:.6}\n", fit.gains.kd));
    if !fit.converged {
        out.push_str("\nWarning: optimizer did not converge; gains are the best iterate found.\n");
    }
    out
}

/// The control-type presets and accepted scenario names.
pub fn format_presets() -> String {
    let mut out = String::new();
    out.push_str("Control-type presets (initial Kp, Ki, Kd):\n");
    for ct in ControlType::ALL {
        let g = ct.seed();
        out.push_str(&format!(
            "  {:<12} {}\n",
            ct.display_name(),
            fmt_vec(&[g.kp, g.ki, g.kd])
        ));
    }
    out.push_str("\nScenarios:\n");
    for name in Scenario::NAMES {
        out.push_str(&format!("  {name}\n"));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ControllerOrder, LossKind, PidGains, StepKind, Termination, Trace};

    fn fit(converged: bool) -> FitResult {
        FitResult {
            gains: PidGains::new(2.0, 0.5, 0.0),
            loss: 1.5e-9,
            converged,
            iterations: 42,
            evaluations: 80,
            order: ControllerOrder::Pid,
            loss_kind: LossKind::Mse,
            termination: if converged {
                Termination::Converged
            } else {
                Termination::IterationLimit
            },
        }
    }

    fn residuals() -> Residuals {
        Residuals {
            predicted: vec![0.0],
            residuals: vec![0.0],
            rmse: 0.0,
            max_abs: 0.0,
        }
    }

    #[test]
    fn fit_summary_lists_gains_and_diagnostics() {
        let stats = Trace::new(vec![0.0, 1.0], vec![1.0, 1.0], vec![0.0, 0.5], vec![0.0, 0.0])
            .unwrap()
            .stats();
        let text = format_fit_summary(&stats, &[1.0, 1.0, 1.0], &fit(true), &residuals(), None);
        assert!(text.contains("Order: PID"));
        assert!(text.contains("- Kp = 2.000000"));
        assert!(text.contains("- Ki = 0.500000"));
        assert!(text.contains("- iterations : 42 (80 evaluations)"));
        assert!(text.contains("initial guess: [1.0000, 1.0000, 1.0000]"));
        assert!(!text.contains("Warning"));

        let text = format_fit_summary(&stats, &[1.0, 1.0, 1.0], &fit(false), &residuals(), None);
        assert!(text.contains("Warning: optimizer did not converge"));
    }

    #[test]
    fn generate_summary_names_scenario() {
        let config = ScenarioConfig::new(Scenario::StepChange(StepKind::Ramp))
            .with_saturation(0.0, 100.0)
            .unwrap();
        let stats = Trace::new(vec![0.0, 1.0], vec![1.0, 1.0], vec![0.0, 0.5], vec![0.0, 0.0])
            .unwrap()
            .stats();
        let text = format_generate_summary(&config, &stats);
        assert!(text.contains("Scenario: step/ramp"));
        assert!(text.contains("Saturation: [0, 100]"));
        assert!(text.contains("(uniform)"));
    }

    #[test]
    fn presets_table_lists_everything() {
        let text = format_presets();
        assert!(text.contains("Pressure     [10.0000, 2.0000, 0.5000]"));
        assert!(text.contains("closed-loop/pressure"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("temperature", 5), "temp.");
        assert_eq!(truncate("flow", 5), "flow");
    }
}
