//! Multi-start fitting.
//!
//! The simplex search is local, so a poor initial guess can stall in a flat
//! region. Multi-start runs one fit per start point (in parallel) and keeps:
//!
//! 1. a converged fit over a non-converged one
//! 2. then the lowest loss
//! 3. then the earliest start point (deterministic tie-break)

use rayon::prelude::*;

use crate::domain::{ControlType, ControllerOrder, FitOptions, FitResult, Trace};
use crate::error::{PidError, PidResult};
use crate::fit::fitter::fit_gains;

/// A labelled initial guess.
#[derive(Debug, Clone, PartialEq)]
pub struct StartPoint {
    pub label: String,
    pub guess: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub start: StartPoint,
    pub result: FitResult,
}

/// Output of a multi-start fit.
#[derive(Debug, Clone)]
pub struct MultiStartFit {
    pub best: FitResult,
    /// Index into `outcomes` of the selected fit.
    pub best_index: usize,
    /// One outcome per start point, in start order.
    pub outcomes: Vec<StartOutcome>,
}

impl MultiStartFit {
    pub fn best_start(&self) -> &StartPoint {
        &self.outcomes[self.best_index].start
    }
}

/// The user's guess (if any) followed by every control-type preset.
pub fn start_points(user_guess: Option<&[f64]>, order: ControllerOrder) -> Vec<StartPoint> {
    let mut starts = Vec::with_capacity(ControlType::ALL.len() + 1);
    if let Some(guess) = user_guess {
        starts.push(StartPoint {
            label: "initial".to_string(),
            guess: guess.to_vec(),
        });
    }
    starts.extend(ControlType::ALL.iter().map(|ct| StartPoint {
        label: ct.display_name().to_lowercase(),
        guess: ct.seed().to_free(order),
    }));
    starts
}

/// Fit from every start point and keep the best result.
pub fn fit_multistart(trace: &Trace, starts: &[StartPoint], opts: &FitOptions) -> PidResult<MultiStartFit> {
    if starts.is_empty() {
        return Err(PidError::config("Multi-start needs at least one start point."));
    }

    let results: Vec<FitResult> = starts
        .par_iter()
        .map(|start| fit_gains(trace, &start.guess, opts))
        .collect::<PidResult<_>>()?;

    let best_index = select_best(&results);
    let outcomes: Vec<StartOutcome> = starts
        .iter()
        .cloned()
        .zip(results)
        .map(|(start, result)| StartOutcome { start, result })
        .collect();
    let best = outcomes[best_index].result.clone();

    log::info!(
        "multi-start: {} starts, best from `{}` (loss={:.6e}, converged={})",
        outcomes.len(),
        outcomes[best_index].start.label,
        best.loss,
        best.converged
    );

    Ok(MultiStartFit {
        best,
        best_index,
        outcomes,
    })
}

/// Index of the preferred result. `results` must be non-empty.
pub fn select_best(results: &[FitResult]) -> usize {
    let mut best = 0usize;
    for (idx, r) in results.iter().enumerate().skip(1) {
        let cur = &results[best];
        let better = match (r.converged, cur.converged) {
            (true, false) => true,
            (false, true) => false,
            _ => r.loss < cur.loss,
        };
        if better {
            best = idx;
        }
    }
    best
}
