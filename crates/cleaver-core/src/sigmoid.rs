//! Platt-style probability calibration.
//!
//! Fits `p(d) = 1 / (1 + exp(A·d + B))` to raw decision values with the damped
//! Newton method of Lin, Weng and Platt, "A Note on Platt's Probabilistic
//! Outputs for Support Vector Machines" (2007).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CleaverError, Result};

/// Tuning knobs for [`Sigmoid::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigmoidConfig {
    /// Newton iterations before giving up.
    pub max_iterations: usize,
    /// Both gradient components must fall below this to stop.
    pub tolerance: f64,
    /// Smallest line-search step tried before failing.
    pub min_step: f64,
    /// Added to the Hessian diagonal.
    pub ridge: f64,
    /// Armijo sufficient-decrease constant.
    pub sufficient_decrease: f64,
}

impl Default for SigmoidConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-5,
            min_step: 1e-10,
            ridge: 1e-12,
            sufficient_decrease: 1e-4,
        }
    }
}

impl SigmoidConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    pub fn with_min_step(mut self, min_step: f64) -> Self {
        self.min_step = min_step.abs();
        self
    }

    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge.abs();
        self
    }
}

/// Calibration curve parameters `(A, B)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sigmoid {
    pub a: f64,
    pub b: f64,
}

impl Sigmoid {
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Calibrated probability of the positive class for decision value `d`.
    #[must_use]
    pub fn evaluate(&self, d: f64) -> f64 {
        1.0 / (1.0 + (self.a * d + self.b).exp())
    }

    /// Fits `(A, B)` to decision values and their ground truth.
    ///
    /// # Arguments
    ///
    /// * `decision_values` - raw model outputs, one per example
    /// * `labels` - `true` for positive examples
    /// * `config` - iteration cap and tolerances
    ///
    /// # Errors
    ///
    /// [`CleaverError::Configuration`] if the inputs are empty or of different
    /// lengths; [`CleaverError::ConvergenceFailure`] if the line search cannot
    /// find a sufficient decrease or the iteration cap is reached.
    pub fn fit(decision_values: &[f64], labels: &[bool], config: &SigmoidConfig) -> Result<Self> {
        if decision_values.len() != labels.len() {
            return Err(CleaverError::Configuration(format!(
                "{} decision values but {} labels",
                decision_values.len(),
                labels.len()
            )));
        }
        if decision_values.is_empty() {
            return Err(CleaverError::Configuration(
                "cannot fit a sigmoid without examples".into(),
            ));
        }

        let positives = labels.iter().filter(|&&y| y).count() as f64;
        let negatives = labels.len() as f64 - positives;

        // Smoothed targets
        let hi = (positives + 1.0) / (positives + 2.0);
        let lo = 1.0 / (negatives + 2.0);
        let targets: Vec<f64> = labels.iter().map(|&y| if y { hi } else { lo }).collect();

        let objective = |a: f64, b: f64| -> f64 {
            decision_values
                .iter()
                .zip(&targets)
                .map(|(&d, &t)| {
                    let f = d * a + b;
                    if f >= 0.0 {
                        t * f + (-f).exp().ln_1p()
                    } else {
                        (t - 1.0) * f + f.exp().ln_1p()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((negatives + 1.0) / (positives + 1.0)).ln();
        let mut fval = objective(a, b);

        for iteration in 0..config.max_iterations {
            let mut h11 = config.ridge;
            let mut h22 = config.ridge;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;
            for (&d, &t) in decision_values.iter().zip(&targets) {
                let f = d * a + b;
                let (p, q) = if f >= 0.0 {
                    let e = (-f).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += d * d * d2;
                h22 += d2;
                h21 += d * d2;
                let d1 = t - p;
                g1 += d * d1;
                g2 += d1;
            }

            if g1.abs() < config.tolerance && g2.abs() < config.tolerance {
                debug!(iteration, a, b, "sigmoid fit converged");
                return Ok(Self { a, b });
            }

            // Newton direction
            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            loop {
                if step < config.min_step {
                    return Err(CleaverError::ConvergenceFailure(format!(
                        "line search failed at iteration {iteration} (A={a}, B={b})"
                    )));
                }
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(new_a, new_b);
                if new_f < fval + config.sufficient_decrease * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }
        }

        Err(CleaverError::ConvergenceFailure(format!(
            "no convergence after {} iterations (A={a}, B={b})",
            config.max_iterations
        )))
    }
}
