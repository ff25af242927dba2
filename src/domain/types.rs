//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON fit reports
//! - selected directly from CLI flags (`clap::ValueEnum`)

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::ScenarioConfig;
use crate::error::{PidError, PidResult};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(with = "crate::domain::non_finite")]
    pub kp: f64,
    #[serde(with = "crate::domain::non_finite")]
    pub ki: f64,
    #[serde(with = "crate::domain::non_finite")]
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// Rebuild gains from an optimizer vector of the order's length.
    ///
    /// For `Pi` the vector holds `[Kp, Ki]` and `Kd` is pinned to exactly 0.
    pub fn try_from_free(order: ControllerOrder, free: &[f64]) -> PidResult<Self> {
        if free.len() != order.free_len() {
            return Err(PidError::parse(format!(
                "{} gains need {} values, got {}",
                order.display_name(),
                order.free_len(),
                free.len()
            )));
        }
        Ok(Self::from_free(order, free))
    }

    /// Unchecked [`try_from_free`](Self::try_from_free) for vectors built by
    /// the optimizer.
    pub(crate) fn from_free(order: ControllerOrder, free: &[f64]) -> Self {
        match order {
            ControllerOrder::Pi => Self::new(free[0], free[1], 0.0),
            ControllerOrder::Pid => Self::new(free[0], free[1], free[2]),
        }
    }

    /// The free (optimized) coordinates for the given order.
    pub fn to_free(self, order: ControllerOrder) -> Vec<f64> {
        match order {
            ControllerOrder::Pi => vec![self.kp, self.ki],
            ControllerOrder::Pid => vec![self.kp, self.ki, self.kd],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

impl std::fmt::Display for PidGains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Kp={:.4}, Ki={:.4}, Kd={:.4}", self.kp, self.ki, self.kd)
    }
}

/// Controller structure to identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ControllerOrder {
    /// Proportional-integral: `Kd` is frozen at 0 and never optimized.
    Pi,
    /// Full proportional-integral-derivative.
    Pid,
}

impl ControllerOrder {
    /// Number of free optimizer dimensions.
    pub fn free_len(self) -> usize {
        match self {
            ControllerOrder::Pi => 2,
            ControllerOrder::Pid => 3,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ControllerOrder::Pi => "PI",
            ControllerOrder::Pid => "PID",
        }
    }
}

/// How residuals are reduced to a scalar loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    /// Mean squared error.
    Mse,
    /// Sum of squared errors.
    Sse,
}

/// Numerical derivative used for the D term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeScheme {
    /// Gradient of the error with respect to time: central differences on the
    /// interior, one-sided differences at both ends.
    Gradient,
    /// Per-sample backward difference `e[i] - e[i-1]` (what a sequential
    /// controller computes). The first sample has derivative 0.
    Backward,
}

/// Minimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    /// Derivative-free Nelder–Mead simplex search from the initial guess.
    NelderMead,
    /// Direct SVD least-squares solve (the response is linear in the gains).
    #[value(name = "linear")]
    LinearLeastSquares,
}

/// Named initial-guess presets per loop category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Flow,
    Pressure,
    Temperature,
}

impl ControlType {
    pub const ALL: [ControlType; 3] = [ControlType::Flow, ControlType::Pressure, ControlType::Temperature];

    pub fn display_name(self) -> &'static str {
        match self {
            ControlType::Flow => "Flow",
            ControlType::Pressure => "Pressure",
            ControlType::Temperature => "Temperature",
        }
    }

    /// Default starting gains for this loop category.
    pub fn seed(self) -> PidGains {
        match self {
            ControlType::Flow => PidGains::new(2.0, 0.5, 0.1),
            ControlType::Pressure => PidGains::new(10.0, 2.0, 0.5),
            ControlType::Temperature => PidGains::new(1.5, 0.1, 0.05),
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    Converged,
    IterationLimit,
    EvaluationLimit,
    Cancelled,
    /// Closed-form solve succeeded.
    Solved,
    /// Closed-form solve failed (degenerate design matrix).
    Singular,
}

/// Outcome of a single fit invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub gains: PidGains,
    /// Final loss value (per `loss_kind`); `+inf` if every candidate overflowed.
    #[serde(with = "crate::domain::non_finite")]
    pub loss: f64,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
    pub order: ControllerOrder,
    pub loss_kind: LossKind,
    pub termination: Termination,
}

impl FitResult {
    /// Turn a non-converged result into [`PidError::OptimizationFailure`].
    ///
    /// Fitting itself never fails on non-convergence; callers that want a hard
    /// failure opt into it here.
    pub fn require_converged(self) -> PidResult<FitResult> {
        if self.converged {
            Ok(self)
        } else {
            Err(PidError::OptimizationFailure { best: Box::new(self) })
        }
    }
}

/// Options that affect how gains are identified.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub order: ControllerOrder,
    pub loss: LossKind,
    pub derivative: DerivativeScheme,
    pub solver: Solver,
    /// Simplex iteration budget (shared across restarts).
    pub max_iterations: usize,
    /// Loss evaluation budget (shared across restarts).
    pub max_evaluations: usize,
    /// Simplex size tolerance (max-norm distance to the best vertex).
    pub xatol: f64,
    /// Loss spread tolerance across simplex vertices.
    pub fatol: f64,
    /// Number of times the simplex is rebuilt around the best vertex after
    /// converging.
    pub restarts: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            order: ControllerOrder::Pid,
            loss: LossKind::Mse,
            derivative: DerivativeScheme::Gradient,
            solver: Solver::NelderMead,
            max_iterations: 5_000,
            max_evaluations: 10_000,
            xatol: 1e-8,
            fatol: 1e-12,
            restarts: 2,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> PidResult<()> {
        if self.max_iterations == 0 || self.max_evaluations == 0 {
            return Err(PidError::config("Iteration and evaluation budgets must be > 0."));
        }
        if !(self.xatol.is_finite() && self.xatol > 0.0) {
            return Err(PidError::config(format!("Invalid xatol: {}", self.xatol)));
        }
        if !(self.fatol.is_finite() && self.fatol > 0.0) {
            return Err(PidError::config(format!("Invalid fatol: {}", self.fatol)));
        }
        Ok(())
    }
}

/// Column names used to build a trace from tabular data.
///
/// Names are matched case-sensitively against the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub time: String,
    pub pv: String,
    pub out: String,
    pub sp: String,
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            pv: "PV".to_string(),
            out: "OUT".to_string(),
            sp: "SP".to_string(),
        }
    }
}

/// A full `pidfit fit` run as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    pub columns: ColumnSelection,
    /// Explicit initial guess; takes precedence over `control_type`.
    pub guess: Option<Vec<f64>>,
    pub control_type: Option<ControlType>,
    pub options: FitOptions,
    /// Also start from every control-type preset and keep the best fit.
    pub multistart: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_report: Option<PathBuf>,
    /// Turn non-convergence into [`PidError::OptimizationFailure`].
    pub require_converged: bool,
}

impl FitConfig {
    /// Resolve the initial guess: explicit > preset > unit gains.
    pub fn initial_guess(&self) -> Vec<f64> {
        if let Some(guess) = &self.guess {
            return guess.clone();
        }
        let seed = self
            .control_type
            .map(ControlType::seed)
            .unwrap_or(PidGains::new(1.0, 1.0, 1.0));
        seed.to_free(self.options.order)
    }
}

/// A full `pidfit generate` run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub scenario: ScenarioConfig,
    /// Replace the OUT surrogate with the PID response to these gains.
    pub model_gains: Option<PidGains>,
    pub derivative: DerivativeScheme,
    pub output: Option<PathBuf>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

/// Parse a comma-separated list of reals such as `"1, 0.5, 0.1"`.
pub fn parse_real_list(text: &str, what: &str) -> PidResult<Vec<f64>> {
    let values: PidResult<Vec<f64>> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PidError::parse(format!("{what}: `{s}` is not a finite number")))
        })
        .collect();
    let values = values?;
    if values.is_empty() {
        return Err(PidError::parse(format!("{what}: no values given")));
    }
    Ok(values)
}

/// Parse an initial guess of 2 (PI) or 3 (PI/PID) gains.
pub fn parse_guess(text: &str) -> PidResult<Vec<f64>> {
    let values = parse_real_list(text, "initial guess")?;
    if !(2..=3).contains(&values.len()) {
        return Err(PidError::parse(format!(
            "initial guess: expected 2 or 3 values, got {}",
            values.len()
        )));
    }
    Ok(values)
}

/// Parse gains given as exactly `Kp,Ki,Kd`.
pub fn parse_gains(text: &str) -> PidResult<PidGains> {
    let values = parse_real_list(text, "gains")?;
    match values.as_slice() {
        [kp, ki, kd] => Ok(PidGains::new(*kp, *ki, *kd)),
        _ => Err(PidError::parse(format!("gains: expected Kp,Ki,Kd, got {} values", values.len()))),
    }
}

/// Parse saturation bounds given as `min,max`.
pub fn parse_bounds(text: &str) -> PidResult<(f64, f64)> {
    let values = parse_real_list(text, "saturation bounds")?;
    match values.as_slice() {
        [lo, hi] => Ok((*lo, *hi)),
        _ => Err(PidError::parse(format!(
            "saturation bounds: expected min,max, got {} values",
            values.len()
        ))),
    }
}
