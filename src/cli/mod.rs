//! Command-line parsing for the PID gain estimator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{ControlType, ControllerOrder, DerivativeScheme, LossKind, Solver};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pidfit", version, about = "PID gain estimation from recorded loop data")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a synthetic SP/PV/OUT trace for a scenario.
    Generate(GenerateArgs),
    /// Fit PID gains to a CSV trace and print diagnostics.
    Fit(FitArgs),
    /// Print a previously exported fit report.
    Show(ShowArgs),
    /// List control-type presets and scenario names.
    Presets,
}

#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Scenario as `behavior/subtype` (see `pidfit presets`).
    #[arg(short, long, default_value = "step/single")]
    pub scenario: String,

    /// Standard deviation of the Gaussian noise added to PV.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Standard deviation of the noise on the synthetic OUT surrogate
    /// (open-loop scenarios; default 0.2).
    #[arg(long)]
    pub output_noise: Option<f64>,

    /// Deadtime (s) before PV follows the setpoint (step, oscillatory and
    /// nonlinear scenarios; default 0).
    #[arg(long)]
    pub delay: Option<f64>,

    /// Clamp PV and OUT to `min,max`.
    #[arg(long, value_name = "MIN,MAX", allow_hyphen_values = true)]
    pub saturation: Option<String>,

    /// Angular frequency (rad/s) for `stable/drifting`.
    #[arg(long)]
    pub drift_omega: Option<f64>,

    /// PV drop for `step/disturbance`.
    #[arg(long)]
    pub disturbance_magnitude: Option<f64>,

    /// Time (s) of the PV drop for `step/disturbance`.
    #[arg(long)]
    pub disturbance_time: Option<f64>,

    /// Controller gains `Kp,Ki,Kd` for `closed-loop/pressure`.
    #[arg(long, value_name = "KP,KI,KD", allow_hyphen_values = true)]
    pub regulator_gains: Option<String>,

    /// Replace OUT with the PID response to `Kp,Ki,Kd` (ground-truth datasets).
    #[arg(long, value_name = "KP,KI,KD", allow_hyphen_values = true)]
    pub model_gains: Option<String>,

    /// Derivative scheme used with `--model-gains`.
    #[arg(long, value_enum, default_value_t = DerivativeScheme::Gradient)]
    pub derivative: DerivativeScheme,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the trace to CSV (`time,PV,OUT,SP`).
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Render an ASCII plot of SP and PV.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// CSV file with time, PV, OUT and SP columns.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Name of the time column.
    #[arg(long, default_value = "time")]
    pub time_col: String,

    /// Name of the process-variable column.
    #[arg(long, default_value = "PV")]
    pub pv_col: String,

    /// Name of the controller-output column.
    #[arg(long, default_value = "OUT")]
    pub out_col: String,

    /// Name of the setpoint column.
    #[arg(long, default_value = "SP")]
    pub sp_col: String,

    /// Initial guess `Kp,Ki[,Kd]`; overrides `--control-type`.
    #[arg(short, long, value_name = "KP,KI[,KD]", allow_hyphen_values = true)]
    pub guess: Option<String>,

    /// Start from a control-type preset.
    #[arg(short = 't', long, value_enum)]
    pub control_type: Option<ControlType>,

    /// Controller structure to identify.
    #[arg(long, value_enum, default_value_t = ControllerOrder::Pid)]
    pub order: ControllerOrder,

    #[arg(long, value_enum, default_value_t = LossKind::Mse)]
    pub loss: LossKind,

    #[arg(long, value_enum, default_value_t = DerivativeScheme::Gradient)]
    pub derivative: DerivativeScheme,

    #[arg(long, value_enum, default_value_t = Solver::NelderMead)]
    pub solver: Solver,

    /// Simplex iteration budget.
    #[arg(long, default_value_t = 5_000)]
    pub max_iter: usize,

    /// Loss evaluation budget.
    #[arg(long, default_value_t = 10_000)]
    pub max_evals: usize,

    #[arg(long, default_value_t = 1e-8)]
    pub xatol: f64,

    #[arg(long, default_value_t = 1e-12)]
    pub fatol: f64,

    /// Simplex restarts after convergence.
    #[arg(long, default_value_t = 2)]
    pub restarts: usize,

    /// Also start from every control-type preset and keep the best fit.
    #[arg(long)]
    pub multistart: bool,

    /// Exit with an error when the optimizer does not converge.
    #[arg(long)]
    pub require_converged: bool,

    /// Skip the ASCII plot of observed vs fitted OUT.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the fit report to JSON.
    #[arg(long = "export-report", value_name = "JSON")]
    pub export_report: Option<PathBuf>,
}

/// Options for printing a saved report.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Report JSON produced by `pidfit fit --export-report`.
    #[arg(value_name = "JSON")]
    pub report: PathBuf,
}
