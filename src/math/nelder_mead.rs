//! Nelder–Mead downhill simplex minimizer.
//!
//! Standard coefficients (reflection 1, expansion 2, contraction 1/2,
//! shrink 1/2). The initial simplex perturbs each coordinate of `x0` by 5 %
//! (or sets it to 0.00025 when the coordinate is zero).
//!
//! Termination, checked once per iteration in this order:
//! 1. converged: every vertex is within `xatol` (max-norm) of the best vertex
//!    and every vertex loss is within `fatol` of the best loss
//! 2. iteration / evaluation budget exhausted
//! 3. `should_stop()` returned true
//!
//! Non-finite objective values are treated as `+inf`, so the simplex moves
//! away from them instead of propagating NaN.

use nalgebra::DVector;

const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadOptions {
    pub max_iterations: usize,
    pub max_evaluations: usize,
    pub xatol: f64,
    pub fatol: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NelderMeadStatus {
    Converged,
    IterationLimit,
    EvaluationLimit,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct NelderMeadOutcome {
    pub x: DVector<f64>,
    pub fx: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub status: NelderMeadStatus,
}

struct Counted<F> {
    f: F,
    evaluations: usize,
}

impl<F: FnMut(&DVector<f64>) -> f64> Counted<F> {
    fn eval(&mut self, x: &DVector<f64>) -> f64 {
        self.evaluations += 1;
        let v = (self.f)(x);
        if v.is_finite() { v } else { f64::INFINITY }
    }
}

/// Minimize `f` starting from `x0`.
pub fn minimize<F, S>(f: F, x0: &DVector<f64>, opts: &NelderMeadOptions, should_stop: S) -> NelderMeadOutcome
where
    F: FnMut(&DVector<f64>) -> f64,
    S: Fn() -> bool,
{
    let n = x0.len();
    let mut obj = Counted { f, evaluations: 0 };

    let mut simplex: Vec<(DVector<f64>, f64)> = Vec::with_capacity(n + 1);
    let f0 = obj.eval(x0);
    simplex.push((x0.clone(), f0));
    for k in 0..n {
        let mut y = x0.clone();
        if y[k] != 0.0 {
            y[k] *= 1.0 + NONZERO_DELTA;
        } else {
            y[k] = ZERO_DELTA;
        }
        let fy = obj.eval(&y);
        simplex.push((y, fy));
    }
    sort_simplex(&mut simplex);

    let mut iterations = 0usize;
    let status = loop {
        if n == 0 || has_converged(&simplex, opts.xatol, opts.fatol) {
            break NelderMeadStatus::Converged;
        }
        if iterations >= opts.max_iterations {
            break NelderMeadStatus::IterationLimit;
        }
        if obj.evaluations >= opts.max_evaluations {
            break NelderMeadStatus::EvaluationLimit;
        }
        if should_stop() {
            break NelderMeadStatus::Cancelled;
        }
        iterations += 1;

        let centroid = simplex[..n]
            .iter()
            .fold(DVector::<f64>::zeros(n), |acc, (x, _)| acc + x)
            / n as f64;
        let (worst, f_worst) = simplex[n].clone();
        let f_best = simplex[0].1;
        let f_second_worst = simplex[n - 1].1;

        let xr = &centroid * (1.0 + RHO) - &worst * RHO;
        let fr = obj.eval(&xr);

        if fr < f_best {
            let xe = &centroid * (1.0 + RHO * CHI) - &worst * (RHO * CHI);
            let fe = obj.eval(&xe);
            simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
        } else if fr < f_second_worst {
            simplex[n] = (xr, fr);
        } else {
            let accepted = if fr < f_worst {
                // Outside contraction.
                let xc = &centroid * (1.0 + PSI * RHO) - &worst * (PSI * RHO);
                let fc = obj.eval(&xc);
                (fc <= fr).then_some((xc, fc))
            } else {
                // Inside contraction.
                let xcc = &centroid * (1.0 - PSI) + &worst * PSI;
                let fcc = obj.eval(&xcc);
                (fcc < f_worst).then_some((xcc, fcc))
            };

            match accepted {
                Some(vertex) => simplex[n] = vertex,
                None => {
                    let best = simplex[0].0.clone();
                    for vertex in simplex.iter_mut().skip(1) {
                        let x = &best + (&vertex.0 - &best) * SIGMA;
                        let fx = obj.eval(&x);
                        *vertex = (x, fx);
                    }
                }
            }
        }

        sort_simplex(&mut simplex);
    };

    let (x, fx) = simplex.swap_remove(0);
    NelderMeadOutcome {
        x,
        fx,
        iterations,
        evaluations: obj.evaluations,
        status,
    }
}

fn sort_simplex(simplex: &mut [(DVector<f64>, f64)]) {
    // Stable sort keeps the older vertex first on ties.
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
}

fn has_converged(simplex: &[(DVector<f64>, f64)], xatol: f64, fatol: f64) -> bool {
    let (best, f_best) = (&simplex[0].0, simplex[0].1);
    simplex[1..].iter().all(|(x, fx)| {
        let dx = (x - best).amax();
        let df = (fx - f_best).abs();
        dx <= xatol && df <= fatol
    })
}
