//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initializes logging
//! - generates synthetic traces
//! - runs gain fitting
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, GenerateArgs, ShowArgs};
use crate::domain::{
    ClosedLoopKind, ColumnSelection, FitConfig, FitOptions, GenerateConfig, Scenario, ScenarioConfig, StableKind,
    StepKind, parse_bounds, parse_gains, parse_guess,
};
use crate::error::{PidError, PidResult};
use crate::io::{FitReportFile, StartSummary, read_report_json, write_report_json, write_trace_csv};
use crate::plot::{AsciiRenderer, Renderer, Series};

pub mod pipeline;

/// Entry point for the `pidfit` binary.
pub fn run() -> PidResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate(args) => handle_generate(&args),
        Command::Fit(args) => handle_fit(&args),
        Command::Show(args) => handle_show(&args),
        Command::Presets => {
            println!("{}", crate::report::format_presets());
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // `try_init` so repeated calls (tests, embedding) are harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).try_init();
}

fn handle_generate(args: &GenerateArgs) -> PidResult<()> {
    let config = generate_config_from_args(args)?;
    let trace = pipeline::run_generate(&config)?;

    println!(
        "{}",
        crate::report::format_generate_summary(&config.scenario, &trace.stats())
    );

    if config.plot {
        let renderer = AsciiRenderer {
            width: config.plot_width,
            height: config.plot_height,
        };
        let plot = renderer.plot(&[
            Series::line("SP", '=', trace.time(), trace.sp()),
            Series::line("PV", '*', trace.time(), trace.pv()),
        ]);
        println!("{plot}");
    }

    if let Some(path) = &config.output {
        write_trace_csv(path, &trace)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_fit(args: &FitArgs) -> PidResult<()> {
    let config = fit_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(
            &run.ingest.trace.stats(),
            &run.guess,
            &run.fit,
            &run.residuals,
            run.multistart.as_ref(),
        )
    );

    if config.plot {
        let renderer = AsciiRenderer {
            width: config.plot_width,
            height: config.plot_height,
        };
        let trace = &run.ingest.trace;
        let plot = renderer.plot(&[
            Series::line("fitted OUT", '-', trace.time(), &run.residuals.predicted),
            Series::points("observed OUT", 'o', trace.time(), trace.out()),
        ]);
        println!("{plot}");
    }

    // Export before enforcing convergence so the best iterate is still saved.
    if let Some(path) = &config.export_report {
        let mut report = FitReportFile::new(
            Some(&config.input),
            run.ingest.trace.len(),
            config.options.derivative,
            config.options.solver,
            run.guess.clone(),
            run.fit.clone(),
        );
        if let Some(ms) = &run.multistart {
            report.starts = ms
                .outcomes
                .iter()
                .map(|o| StartSummary {
                    label: o.start.label.clone(),
                    guess: o.start.guess.clone(),
                    loss: o.result.loss,
                    converged: o.result.converged,
                })
                .collect();
        }
        write_report_json(path, &report)?;
    }

    if config.require_converged {
        run.fit.require_converged()?;
    }
    Ok(())
}

fn handle_show(args: &ShowArgs) -> PidResult<()> {
    let report = read_report_json(&args.report)?;
    let r = &report.result;

    println!("=== pidfit report ({}) ===", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(input) = &report.input {
        println!("Input: {input} ({} samples)", report.n_samples);
    }
    println!(
        "Order: {} | loss: {:?} | derivative: {:?} | solver: {:?}",
        r.order.display_name(),
        r.loss_kind,
        report.derivative,
        report.solver
    );
    println!(
        "Termination: {:?} | converged: {} | iterations: {} | loss: {:.6e}",
        r.termination, r.converged, r.iterations, r.loss
    );
    println!("Gains: {}", r.gains);
    for s in &report.starts {
        println!("  start {:<12} loss={:.6e} converged={}", s.label, s.loss, s.converged);
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> PidResult<FitConfig> {
    let guess = args.guess.as_deref().map(parse_guess).transpose()?;
    let options = FitOptions {
        order: args.order,
        loss: args.loss,
        derivative: args.derivative,
        solver: args.solver,
        max_iterations: args.max_iter,
        max_evaluations: args.max_evals,
        xatol: args.xatol,
        fatol: args.fatol,
        restarts: args.restarts,
    };
    options.validate()?;

    Ok(FitConfig {
        input: args.input.clone(),
        columns: ColumnSelection {
            time: args.time_col.clone(),
            pv: args.pv_col.clone(),
            out: args.out_col.clone(),
            sp: args.sp_col.clone(),
        },
        guess,
        control_type: args.control_type,
        options,
        multistart: args.multistart,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_report: args.export_report.clone(),
        require_converged: args.require_converged,
    })
}

pub fn generate_config_from_args(args: &GenerateArgs) -> PidResult<GenerateConfig> {
    let mut scenario: Scenario = args.scenario.parse()?;

    let mut drift_applies = false;
    let mut disturbance_applies = false;
    let mut regulator_applies = false;
    match &mut scenario {
        Scenario::Stable(StableKind::Drifting { omega }) => {
            drift_applies = true;
            if let Some(w) = args.drift_omega {
                *omega = w;
            }
        }
        Scenario::StepChange(StepKind::PvStepDisturbance { magnitude, at }) => {
            disturbance_applies = true;
            if let Some(m) = args.disturbance_magnitude {
                *magnitude = m;
            }
            if let Some(t) = args.disturbance_time {
                *at = t;
            }
        }
        Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator { gains, .. }) => {
            regulator_applies = true;
            if let Some(text) = &args.regulator_gains {
                *gains = parse_gains(text)?;
            }
        }
        _ => {}
    }

    let misplaced = [
        ("--drift-omega", args.drift_omega.is_some() && !drift_applies),
        (
            "--disturbance-magnitude/--disturbance-time",
            (args.disturbance_magnitude.is_some() || args.disturbance_time.is_some()) && !disturbance_applies,
        ),
        ("--regulator-gains", args.regulator_gains.is_some() && !regulator_applies),
        ("--delay", args.delay.is_some() && !scenario.uses_delay()),
        ("--output-noise", args.output_noise.is_some() && !scenario.uses_output_noise()),
    ];
    if let Some((flag, _)) = misplaced.iter().find(|(_, bad)| *bad) {
        return Err(PidError::config(format!(
            "{flag} does not apply to scenario `{}`.",
            scenario.label()
        )));
    }

    let mut config = ScenarioConfig::new(scenario).with_noise(args.noise).with_seed(args.seed);
    if let Some(delay) = args.delay {
        config = config.with_delay(delay);
    }
    if let Some(output_noise) = args.output_noise {
        config = config.with_output_noise(output_noise);
    }
    if let Some(text) = &args.saturation {
        let (lo, hi) = parse_bounds(text)?;
        config = config.with_saturation(lo, hi)?;
    }
    config.validate()?;

    Ok(GenerateConfig {
        scenario: config,
        model_gains: args.model_gains.as_deref().map(parse_gains).transpose()?,
        derivative: args.derivative,
        output: args.output.clone(),
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
    })
}
