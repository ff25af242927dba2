//! Loss between the model response and the observed controller output.

use crate::domain::{ControllerOrder, DerivativeScheme, LossKind, PidGains, Trace};
use crate::models::Regressors;

/// Loss over one trace, evaluated on the optimizer's free coordinates.
///
/// Regressors are computed once at construction, so each evaluation is a
/// single pass over the samples.
#[derive(Debug, Clone)]
pub struct Objective<'a> {
    order: ControllerOrder,
    kind: LossKind,
    regressors: Regressors,
    observed: &'a [f64],
}

impl<'a> Objective<'a> {
    pub fn new(trace: &'a Trace, order: ControllerOrder, kind: LossKind, scheme: DerivativeScheme) -> Self {
        Self {
            order,
            kind,
            regressors: Regressors::from_trace(trace, scheme),
            observed: trace.out(),
        }
    }

    pub fn order(&self) -> ControllerOrder {
        self.order
    }

    pub fn kind(&self) -> LossKind {
        self.kind
    }

    pub fn regressors(&self) -> &Regressors {
        &self.regressors
    }

    pub fn observed(&self) -> &[f64] {
        self.observed
    }

    /// Loss for a free-coordinate vector (`[Kp, Ki]` or `[Kp, Ki, Kd]`).
    /// The length must match the order.
    pub(crate) fn eval_free(&self, free: &[f64]) -> f64 {
        self.eval(&PidGains::from_free(self.order, free))
    }

    /// Loss for full gains. Non-finite results become `+inf`.
    pub fn eval(&self, gains: &PidGains) -> f64 {
        let sse: f64 = self
            .observed
            .iter()
            .enumerate()
            .map(|(i, y)| {
                let r = y - self.regressors.output_at(i, gains);
                r * r
            })
            .sum();
        let value = match self.kind {
            LossKind::Sse => sse,
            LossKind::Mse => sse / self.observed.len() as f64,
        };
        if value.is_finite() { value } else { f64::INFINITY }
    }
}

/// One-off loss of `gains` against `trace`.
pub fn loss(trace: &Trace, gains: &PidGains, kind: LossKind, scheme: DerivativeScheme) -> f64 {
    Objective::new(trace, ControllerOrder::Pid, kind, scheme).eval(gains)
}
