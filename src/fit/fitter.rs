//! Fitting routines for a single initial guess.
//!
//! Given a validated trace, the observed OUT channel is compared against the
//! PID response model and the gains are found by:
//!
//! - Nelder–Mead on the free coordinates (`[Kp, Ki]` or `[Kp, Ki, Kd]`),
//!   restarted from the best vertex after convergence, or
//! - a closed-form SVD solve of the same least squares problem.
//!
//! Non-convergence is not an error here: the best iterate is returned with
//! `converged = false`.

use std::thread::{self, JoinHandle};

use nalgebra::{DMatrix, DVector};

use crate::domain::{ControllerOrder, FitOptions, FitResult, PidGains, Solver, Termination, Trace};
use crate::error::{PidError, PidResult};
use crate::fit::cancel::CancelToken;
use crate::fit::loss::Objective;
use crate::math::{NelderMeadOptions, NelderMeadStatus, minimize, solve_least_squares};

/// Fit gains from `guess`.
pub fn fit_gains(trace: &Trace, guess: &[f64], opts: &FitOptions) -> PidResult<FitResult> {
    fit_gains_with_cancel(trace, guess, opts, &CancelToken::new())
}

/// Fit gains from `guess`, stopping early once `cancel` is set.
pub fn fit_gains_with_cancel(
    trace: &Trace,
    guess: &[f64],
    opts: &FitOptions,
    cancel: &CancelToken,
) -> PidResult<FitResult> {
    opts.validate()?;
    let x0 = resolve_guess(guess, opts.order)?;

    let objective = Objective::new(trace, opts.order, opts.loss, opts.derivative);
    match opts.solver {
        Solver::NelderMead => Ok(fit_simplex(&objective, x0, opts, cancel)),
        Solver::LinearLeastSquares => Ok(fit_linear(&objective)),
    }
}

/// Check the guess against the controller order.
///
/// A 3-value guess for a PI fit is accepted and its `Kd` dropped.
pub fn resolve_guess(guess: &[f64], order: ControllerOrder) -> PidResult<Vec<f64>> {
    let n = order.free_len();
    let x0 = match (order, guess.len()) {
        (_, len) if len == n => guess.to_vec(),
        (ControllerOrder::Pi, 3) => guess[..2].to_vec(),
        (_, len) => {
            return Err(PidError::parse(format!(
                "{} fit needs {n} initial gains, got {len}",
                order.display_name()
            )));
        }
    };
    if let Some(bad) = x0.iter().find(|v| !v.is_finite()) {
        return Err(PidError::parse(format!("Initial gain must be finite, got {bad}")));
    }
    Ok(x0)
}

fn fit_simplex(objective: &Objective<'_>, x0: Vec<f64>, opts: &FitOptions, cancel: &CancelToken) -> FitResult {
    let mut x = DVector::from_vec(x0);
    let mut fx = f64::INFINITY;
    let mut iterations = 0usize;
    let mut evaluations = 0usize;
    let mut status = NelderMeadStatus::Converged;

    for attempt in 0..=opts.restarts {
        let nm_opts = NelderMeadOptions {
            max_iterations: opts.max_iterations.saturating_sub(iterations),
            max_evaluations: opts.max_evaluations.saturating_sub(evaluations),
            xatol: opts.xatol,
            fatol: opts.fatol,
        };
        let outcome = minimize(
            |v: &DVector<f64>| objective.eval_free(v.as_slice()),
            &x,
            &nm_opts,
            || cancel.is_cancelled(),
        );
        iterations += outcome.iterations;
        evaluations += outcome.evaluations;
        log::debug!(
            "simplex attempt {attempt}: loss={:.6e} status={:?} iterations={iterations}",
            outcome.fx,
            outcome.status
        );

        let improvement = fx - outcome.fx;
        if outcome.fx <= fx {
            x = outcome.x;
            fx = outcome.fx;
        }

        // A restart that runs out of budget keeps the earlier converged point.
        if attempt == 0 || outcome.status == NelderMeadStatus::Converged {
            status = outcome.status;
        }
        if outcome.status != NelderMeadStatus::Converged || improvement <= opts.fatol {
            break;
        }
    }

    let termination = match status {
        NelderMeadStatus::Converged => Termination::Converged,
        NelderMeadStatus::IterationLimit => Termination::IterationLimit,
        NelderMeadStatus::EvaluationLimit => Termination::EvaluationLimit,
        NelderMeadStatus::Cancelled => Termination::Cancelled,
    };
    if termination != Termination::Converged {
        log::warn!("optimizer stopped without converging ({termination:?}); returning best iterate");
    }

    FitResult {
        gains: PidGains::from_free(objective.order(), x.as_slice()),
        loss: fx,
        converged: termination == Termination::Converged,
        iterations,
        evaluations,
        order: objective.order(),
        loss_kind: objective.kind(),
        termination,
    }
}

/// Closed-form least squares fit.
///
/// The response is linear in the gains, so the design matrix columns are the
/// error, integral and (for PID) derivative channels.
pub fn fit_linear(objective: &Objective<'_>) -> FitResult {
    let order = objective.order();
    let r = objective.regressors();
    let n = r.len();
    let p = order.free_len();

    let mut x = DMatrix::<f64>::zeros(n, p);
    for i in 0..n {
        x[(i, 0)] = r.error[i];
        x[(i, 1)] = r.integral[i];
        if p == 3 {
            x[(i, 2)] = r.derivative[i];
        }
    }
    let y = DVector::from_column_slice(objective.observed());

    let (gains, termination) = match solve_least_squares(&x, &y) {
        Some(beta) => (PidGains::from_free(order, beta.as_slice()), Termination::Solved),
        None => {
            log::warn!("linear least squares failed; design matrix is degenerate");
            (PidGains::default(), Termination::Singular)
        }
    };

    FitResult {
        gains,
        loss: objective.eval(&gains),
        converged: termination == Termination::Solved,
        iterations: 0,
        evaluations: 1,
        order,
        loss_kind: objective.kind(),
        termination,
    }
}

/// A fit running on a worker thread.
#[derive(Debug)]
pub struct BackgroundFit {
    cancel: CancelToken,
    handle: JoinHandle<PidResult<FitResult>>,
}

impl BackgroundFit {
    /// Ask the optimizer to stop at its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the fit. A panic on the worker is resumed on the caller.
    pub fn join(self) -> PidResult<FitResult> {
        self.handle
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    }
}

/// Run [`fit_gains_with_cancel`] on a new thread.
pub fn fit_in_background(trace: Trace, guess: Vec<f64>, opts: FitOptions) -> BackgroundFit {
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let handle = thread::spawn(move || fit_gains_with_cancel(&trace, &guess, &opts, &worker_cancel));
    BackgroundFit { cancel, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate;
    use crate::domain::{
        ClosedLoopKind, DEFAULT_REGULATOR_GAINS, DerivativeScheme, LossKind, PlantModel, Scenario, ScenarioConfig,
        StableKind, StepKind,
    };
    use crate::models::synthesize_output;

    fn step_trace(delay: f64) -> Trace {
        let config = ScenarioConfig::new(Scenario::StepChange(StepKind::Single))
            .with_output_noise(0.0)
            .with_delay(delay);
        generate(&config).unwrap()
    }

    fn assert_close(actual: f64, expected: f64, rel: f64) {
        assert!(
            (actual - expected).abs() <= rel * expected.abs(),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn recovers_pi_gains_on_step_trace() {
        let truth = PidGains::new(2.0, 0.5, 0.0);
        let trace = synthesize_output(&step_trace(6.5), &truth, DerivativeScheme::Gradient).unwrap();
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &FitOptions::default()).unwrap();

        assert!(fit.converged, "{fit:?}");
        assert_close(fit.gains.kp, 2.0, 0.01);
        assert_close(fit.gains.ki, 0.5, 0.01);
        assert!(fit.gains.kd.abs() < 0.01, "kd={}", fit.gains.kd);
        assert!(fit.loss < 1e-8);
    }

    #[test]
    fn recovers_full_pid_gains() {
        let truth = PidGains::new(1.2, 0.3, 0.05);
        let trace = synthesize_output(&step_trace(6.5), &truth, DerivativeScheme::Gradient).unwrap();
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &FitOptions::default()).unwrap();

        assert!(fit.converged);
        assert_close(fit.gains.kp, 1.2, 0.01);
        assert_close(fit.gains.ki, 0.3, 0.01);
        assert_close(fit.gains.kd, 0.05, 0.01);
    }

    #[test]
    fn pi_order_returns_exact_zero_kd() {
        let truth = PidGains::new(2.0, 0.5, 0.3);
        let trace = synthesize_output(&step_trace(6.5), &truth, DerivativeScheme::Gradient).unwrap();
        let opts = FitOptions {
            order: ControllerOrder::Pi,
            ..FitOptions::default()
        };
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &opts).unwrap();
        assert_eq!(fit.gains.kd, 0.0);
        assert_eq!(fit.order, ControllerOrder::Pi);
    }

    #[test]
    fn recovers_closed_loop_regulator() {
        let scenario = Scenario::ClosedLoop(ClosedLoopKind::PressureRegulator {
            gains: DEFAULT_REGULATOR_GAINS,
            plant: PlantModel::default(),
        });
        let trace = generate(&ScenarioConfig::new(scenario)).unwrap();
        let opts = FitOptions {
            derivative: DerivativeScheme::Backward,
            ..FitOptions::default()
        };
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &opts).unwrap();
        assert_close(fit.gains.kp, 1.5, 0.01);
        assert_close(fit.gains.ki, 0.1, 0.01);
        assert_close(fit.gains.kd, 0.05, 0.01);
    }

    #[test]
    fn linear_solver_matches_truth() {
        let truth = PidGains::new(2.0, 0.5, 0.1);
        let trace = synthesize_output(&step_trace(6.5), &truth, DerivativeScheme::Gradient).unwrap();
        let opts = FitOptions {
            solver: Solver::LinearLeastSquares,
            ..FitOptions::default()
        };
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &opts).unwrap();
        assert_eq!(fit.termination, Termination::Solved);
        assert!((fit.gains.kp - 2.0).abs() < 1e-8);
        assert!((fit.gains.ki - 0.5).abs() < 1e-8);
        assert!((fit.gains.kd - 0.1).abs() < 1e-8);
    }

    #[test]
    fn zero_error_trace_does_not_panic() {
        let config = ScenarioConfig::new(Scenario::Stable(StableKind::Constant)).with_output_noise(0.0);
        let trace = generate(&config).unwrap();
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &FitOptions::default()).unwrap();
        assert!(fit.gains.is_finite());
        assert_eq!(fit.loss, 0.0);
    }

    #[test]
    fn guess_length_must_match_order() {
        let trace = step_trace(0.0);
        let err = fit_gains(&trace, &[1.0, 1.0], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, PidError::ParameterParse(_)));

        let pi = FitOptions {
            order: ControllerOrder::Pi,
            ..FitOptions::default()
        };
        assert!(fit_gains(&trace, &[1.0, 1.0], &pi).is_ok());
        assert!(fit_gains(&trace, &[1.0], &pi).is_err());
        assert!(fit_gains(&trace, &[1.0, f64::NAN, 1.0], &FitOptions::default()).is_err());
    }

    #[test]
    fn iteration_budget_reports_non_convergence() {
        let truth = PidGains::new(2.0, 0.5, 0.0);
        let trace = synthesize_output(&step_trace(6.5), &truth, DerivativeScheme::Gradient).unwrap();
        let opts = FitOptions {
            max_iterations: 5,
            loss: LossKind::Sse,
            ..FitOptions::default()
        };
        let fit = fit_gains(&trace, &[1.0, 1.0, 1.0], &opts).unwrap();
        assert!(!fit.converged);
        assert_eq!(fit.termination, Termination::IterationLimit);
        assert!(fit.loss.is_finite());
        assert!(matches!(
            fit.require_converged(),
            Err(PidError::OptimizationFailure { .. })
        ));
    }

    #[test]
    fn cancelled_fit_returns_initial_iterate() {
        let trace = step_trace(6.5);
        let token = CancelToken::new();
        token.cancel();
        let fit = fit_gains_with_cancel(&trace, &[1.0, 1.0, 1.0], &FitOptions::default(), &token).unwrap();
        assert_eq!(fit.termination, Termination::Cancelled);
        assert!(!fit.converged);
        assert_eq!(fit.iterations, 0);
    }

    #[test]
    fn background_fit_joins_with_result() {
        let truth = PidGains::new(2.0, 0.5, 0.0);
        let trace = synthesize_output(&step_trace(6.5), &truth, DerivativeScheme::Gradient).unwrap();
        let job = fit_in_background(trace, vec![1.0, 1.0, 1.0], FitOptions::default());
        let fit = job.join().unwrap();
        assert!(fit.converged);
        assert_close(fit.gains.kp, 2.0, 0.01);
    }
}
