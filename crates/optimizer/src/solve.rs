//! Constrained mean-variance optimization over the weight simplex.
//!
//! The feasible set is `w ∈ [0,1]^n` with `Σw = 1`, optionally intersected
//! with the plane of portfolios whose annualized return equals a target.
//! Both constraints are linear, so the solver is projected-gradient descent
//! with a backtracking line search: each step projects back onto the capped
//! simplex (alternating with the target-return plane when one is active).
//! Starting point is the uniform-weights vector. A solve that exhausts its
//! iteration cap, or settles at a point violating the constraints, fails
//! loudly; the initial guess is never returned as a result.

use nalgebra::DVector;
use serde::Serialize;

use crate::errors::OptimizeError;
use crate::simulate::TRADING_DAYS_PER_YEAR;
use crate::snapshot::ReturnsSnapshot;

const MAX_ITERATIONS: usize = 20_000;
/// Step-to-step movement below which the iterate counts as settled.
const CONVERGENCE_TOLERANCE: f64 = 1e-10;
/// Sufficient-decrease constant for the backtracking line search.
const ARMIJO_C1: f64 = 1e-4;
/// Smallest line-search step before the iterate is declared stationary.
const MIN_STEP: f64 = 1e-16;
/// Alternating-projection rounds when a target-return plane is active.
const DYKSTRA_ITERATIONS: usize = 500;
/// Constraint residual tolerated in an accepted solution.
const FEASIBILITY_TOLERANCE: f64 = 1e-6;
/// Below this volatility the Sharpe ratio has no gradient worth following.
const VOLATILITY_FLOOR: f64 = 1e-12;

/// A converged solution of the constrained program.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedPortfolio {
    /// Weights aligned to the snapshot's symbol ordering.
    pub weights: Vec<f64>,
    pub volatility: f64,
    pub expected_return: f64,
    /// Undefined when the optimal portfolio has zero volatility.
    pub sharpe_ratio: Option<f64>,
}

impl ReturnsSnapshot {
    /// Solves the constrained program from the uniform-weights start.
    ///
    /// With `minimize_volatility` the objective is portfolio volatility,
    /// optionally pinned to `target_return`; otherwise the objective is the
    /// negated Sharpe ratio (`target_return` is ignored, matching the
    /// original interface).
    ///
    /// # Errors
    /// Returns [`OptimizeError::InfeasibleTarget`] when no feasible weights
    /// can reach the target, and [`OptimizeError::NoConvergence`] when the
    /// solver exhausts its iteration cap or stops outside the feasible set.
    pub fn optimize(
        &self,
        target_return: Option<f64>,
        minimize_volatility: bool,
    ) -> Result<OptimizedPortfolio, OptimizeError> {
        let n = self.num_symbols();
        let annualized_means = self.mean_returns() * TRADING_DAYS_PER_YEAR;
        let target = if minimize_volatility {
            target_return
        } else {
            None
        };

        if let Some(t) = target {
            // Achievable returns are convex combinations of the per-symbol
            // annualized means.
            let min = annualized_means.min();
            let max = annualized_means.max();
            if t < min - FEASIBILITY_TOLERANCE || t > max + FEASIBILITY_TOLERANCE {
                return Err(OptimizeError::InfeasibleTarget { target: t, min, max });
            }
        }

        let project = |v: &DVector<f64>| match target {
            Some(t) => project_intersection(v, &annualized_means, t),
            None => project_capped_simplex(v),
        };

        let mut w = project(&DVector::from_element(n, 1.0 / n as f64));
        let mut objective = self.objective(&w, minimize_volatility);

        for iteration in 0..MAX_ITERATIONS {
            let gradient = self.gradient(&w, minimize_volatility);

            let mut step = 1.0;
            let mut accepted: Option<(DVector<f64>, f64)> = None;
            while step >= MIN_STEP {
                let candidate = project(&(&w - step * &gradient));
                let candidate_objective = self.objective(&candidate, minimize_volatility);
                let movement = (&candidate - &w).norm_squared();
                if candidate_objective <= objective - ARMIJO_C1 / step * movement {
                    accepted = Some((candidate, candidate_objective));
                    break;
                }
                step *= 0.5;
            }

            // No acceptable step means no descent direction remains: the
            // iterate is stationary on the feasible set.
            let (next, next_objective) = accepted.unwrap_or_else(|| (w.clone(), objective));
            let shift = (&next - &w).norm();
            w = next;
            objective = next_objective;

            if shift < CONVERGENCE_TOLERANCE {
                return self.accept(w, target, iteration + 1);
            }
        }

        let residual = self.gradient(&w, minimize_volatility).norm();
        Err(OptimizeError::NoConvergence {
            iterations: MAX_ITERATIONS,
            residual,
        })
    }

    /// Maximum-Sharpe portfolio.
    ///
    /// # Errors
    /// See [`ReturnsSnapshot::optimize`].
    pub fn max_sharpe(&self) -> Result<OptimizedPortfolio, OptimizeError> {
        self.optimize(None, false)
    }

    /// Global minimum-volatility portfolio.
    ///
    /// # Errors
    /// See [`ReturnsSnapshot::optimize`].
    pub fn min_volatility(&self) -> Result<OptimizedPortfolio, OptimizeError> {
        self.optimize(None, true)
    }

    fn objective(&self, w: &DVector<f64>, minimize_volatility: bool) -> f64 {
        let (volatility, expected_return) = self.annualized_performance(w.as_slice());
        if minimize_volatility {
            volatility
        } else if volatility < VOLATILITY_FLOOR {
            // Repel the search from the degenerate region instead of
            // dividing by zero.
            f64::MAX
        } else {
            -(expected_return - self.risk_free_rate()) / volatility
        }
    }

    fn gradient(&self, w: &DVector<f64>, minimize_volatility: bool) -> DVector<f64> {
        let (volatility, expected_return) = self.annualized_performance(w.as_slice());
        if volatility < VOLATILITY_FLOOR {
            return DVector::zeros(w.len());
        }

        // d/dw √(252·wᵀΣw) = 252·Σw / volatility
        let grad_volatility = self.covariance() * w * (TRADING_DAYS_PER_YEAR / volatility);
        if minimize_volatility {
            return grad_volatility;
        }

        let grad_return = self.mean_returns() * TRADING_DAYS_PER_YEAR;
        let excess = expected_return - self.risk_free_rate();
        let grad_sharpe =
            (grad_return * volatility - grad_volatility * excess) / volatility.powi(2);
        -grad_sharpe
    }

    fn accept(
        &self,
        w: DVector<f64>,
        target: Option<f64>,
        iterations: usize,
    ) -> Result<OptimizedPortfolio, OptimizeError> {
        let sum_residual = (w.sum() - 1.0).abs();
        let bound_residual = w
            .iter()
            .map(|x| (-x).max(x - 1.0).max(0.0))
            .fold(0.0_f64, f64::max);
        let residual = sum_residual.max(bound_residual);
        if residual > FEASIBILITY_TOLERANCE {
            return Err(OptimizeError::NoConvergence {
                iterations,
                residual,
            });
        }

        // Snap the tiny projection residue out of the reported weights.
        let mut weights: Vec<f64> = w.iter().map(|x| x.clamp(0.0, 1.0)).collect();
        let total: f64 = weights.iter().sum();
        for weight in &mut weights {
            *weight /= total;
        }

        let (volatility, expected_return) = self.annualized_performance(&weights);
        let target_residual = target.map_or(0.0, |t| (expected_return - t).abs());
        if target_residual > FEASIBILITY_TOLERANCE {
            return Err(OptimizeError::NoConvergence {
                iterations,
                residual: target_residual,
            });
        }
        let sharpe_ratio = (volatility > 0.0)
            .then(|| (expected_return - self.risk_free_rate()) / volatility);

        Ok(OptimizedPortfolio {
            weights,
            volatility,
            expected_return,
            sharpe_ratio,
        })
    }
}

/// Euclidean projection onto `{w : 0 ≤ w ≤ 1, Σw = 1}`.
///
/// Bisects for the shift `τ` with `Σ clamp(v - τ, 0, 1) = 1`; the clamped
/// sum is monotone in `τ`, and the bracket always holds the root.
fn project_capped_simplex(v: &DVector<f64>) -> DVector<f64> {
    let n = v.len();
    if n == 0 {
        return v.clone();
    }

    let mut lo = v.min() - 1.0;
    let mut hi = v.max();
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        let sum: f64 = v.iter().map(|x| (x - mid).clamp(0.0, 1.0)).sum();
        if sum > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let tau = 0.5 * (lo + hi);

    DVector::from_iterator(n, v.iter().map(|x| (x - tau).clamp(0.0, 1.0)))
}

/// Euclidean projection onto `{w : a·w = target}`.
fn project_hyperplane(v: &DVector<f64>, a: &DVector<f64>, target: f64) -> DVector<f64> {
    let norm_squared = a.norm_squared();
    if norm_squared < f64::EPSILON {
        return v.clone();
    }
    v + a * ((target - a.dot(v)) / norm_squared)
}

/// Dykstra's alternating projection onto the intersection of the capped
/// simplex and the target-return plane.
fn project_intersection(v: &DVector<f64>, a: &DVector<f64>, target: f64) -> DVector<f64> {
    let n = v.len();
    let mut x = v.clone();
    let mut p = DVector::zeros(n);
    let mut q = DVector::zeros(n);

    for _ in 0..DYKSTRA_ITERATIONS {
        let y = project_capped_simplex(&(&x + &p));
        p = &x + &p - &y;
        let z = project_hyperplane(&(&y + &q), a, target);
        q = &y + &q - &z;

        let shift = (&z - &x).norm();
        x = z;
        if shift < 1e-13 {
            break;
        }
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::SimulationConfig;
    use crate::snapshot::SymbolHistory;
    use chrono::NaiveDate;
    use nalgebra::DMatrix;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn history(symbol: &str, closes: &[Decimal]) -> SymbolHistory {
        SymbolHistory {
            symbol: symbol.to_string(),
            closes: closes
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    (
                        NaiveDate::from_ymd_opt(2024, 1, i as u32 + 1).unwrap(),
                        *c,
                    )
                })
                .collect(),
        }
    }

    fn two_asset_snapshot() -> ReturnsSnapshot {
        let a = history(
            "AAA",
            &[
                dec!(100),
                dec!(102),
                dec!(99),
                dec!(104),
                dec!(101),
                dec!(106),
                dec!(103),
                dec!(108),
            ],
        );
        let b = history(
            "BBB",
            &[
                dec!(50),
                dec!(49.5),
                dec!(51),
                dec!(50),
                dec!(52),
                dec!(51),
                dec!(53),
                dec!(52.5),
            ],
        );
        ReturnsSnapshot::from_series(vec![a, b], 0.0531).unwrap()
    }

    fn three_asset_snapshot() -> ReturnsSnapshot {
        let a = history(
            "AAA",
            &[
                dec!(100),
                dec!(103),
                dec!(101),
                dec!(105),
                dec!(104),
                dec!(108),
                dec!(107),
                dec!(111),
            ],
        );
        let b = history(
            "BBB",
            &[
                dec!(50),
                dec!(49),
                dec!(51),
                dec!(50.5),
                dec!(52),
                dec!(51.5),
                dec!(53),
                dec!(52),
            ],
        );
        let c = history(
            "CCC",
            &[
                dec!(200),
                dec!(201),
                dec!(199),
                dec!(203),
                dec!(202),
                dec!(204),
                dec!(203),
                dec!(206),
            ],
        );
        ReturnsSnapshot::from_series(vec![a, b, c], 0.0531).unwrap()
    }

    fn assert_on_simplex(weights: &[f64]) {
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(weights.iter().all(|w| (0.0..=1.0).contains(w)));
    }

    // ============================================================
    // Projections
    // ============================================================

    #[test]
    fn capped_simplex_projection_is_feasible_and_fixes_feasible_points() {
        let v = DVector::from_vec(vec![0.9, -0.4, 0.7]);
        let projected = project_capped_simplex(&v);
        assert_on_simplex(projected.as_slice());

        let feasible = DVector::from_vec(vec![0.25, 0.25, 0.5]);
        let fixed = project_capped_simplex(&feasible);
        assert!((&fixed - &feasible).norm() < 1e-9);
    }

    #[test]
    fn single_asset_projection_is_the_unit_weight() {
        let projected = project_capped_simplex(&DVector::from_vec(vec![0.3]));
        assert!((projected[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hyperplane_projection_lands_on_the_plane() {
        let a = DVector::from_vec(vec![0.3, 0.1]);
        let v = DVector::from_vec(vec![0.5, 0.5]);
        let projected = project_hyperplane(&v, &a, 0.25);
        assert!((a.dot(&projected) - 0.25).abs() < 1e-12);
    }

    // ============================================================
    // Minimum volatility
    // ============================================================

    #[test]
    fn min_volatility_beats_every_simulated_trial() {
        let snapshot = two_asset_snapshot();
        let solved = snapshot.min_volatility().unwrap();
        assert_on_simplex(&solved.weights);

        let trials = snapshot
            .simulate(&SimulationConfig::new(2_000).with_seed(42))
            .unwrap();
        for trial in &trials {
            assert!(solved.volatility <= trial.volatility + 1e-9);
        }
    }

    #[test]
    fn two_asset_min_volatility_matches_analytic_gmv() {
        let snapshot = two_asset_snapshot();
        let solved = snapshot.min_volatility().unwrap();

        // w* = Σ⁻¹1 / (1ᵀΣ⁻¹1), valid here because the solution is interior.
        let cov: DMatrix<f64> = snapshot.covariance().clone();
        let inv = cov.try_inverse().expect("covariance must be invertible");
        let ones = DVector::from_element(2, 1.0);
        let unnormalized = &inv * &ones;
        let analytic = &unnormalized / ones.dot(&unnormalized);

        assert!((solved.weights[0] - analytic[0]).abs() < 1e-4);
        assert!((solved.weights[1] - analytic[1]).abs() < 1e-4);
    }

    #[test]
    fn min_volatility_at_target_return_pins_the_return() {
        let snapshot = three_asset_snapshot();
        let unconstrained = snapshot.min_volatility().unwrap();

        let means = snapshot.mean_returns() * TRADING_DAYS_PER_YEAR;
        let target = 0.5 * (unconstrained.expected_return + means.max());

        let pinned = snapshot.optimize(Some(target), true).unwrap();
        assert_on_simplex(&pinned.weights);
        assert!((pinned.expected_return - target).abs() < 1e-6);
        // Pinning the return cannot reduce volatility below the global
        // minimum.
        assert!(pinned.volatility >= unconstrained.volatility - 1e-9);
    }

    #[test]
    fn unreachable_target_return_is_rejected() {
        let snapshot = two_asset_snapshot();
        let err = snapshot.optimize(Some(100.0), true).unwrap_err();
        assert!(matches!(err, OptimizeError::InfeasibleTarget { .. }));
    }

    // ============================================================
    // Maximum Sharpe
    // ============================================================

    #[test]
    fn max_sharpe_beats_every_simulated_trial() {
        let snapshot = two_asset_snapshot();
        let solved = snapshot.max_sharpe().unwrap();
        assert_on_simplex(&solved.weights);

        let trials = snapshot
            .simulate(&SimulationConfig::new(2_000).with_seed(7))
            .unwrap();
        let best = trials
            .iter()
            .map(|t| t.sharpe_ratio)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(solved.sharpe_ratio.unwrap() >= best - 1e-9);
    }

    #[test]
    fn max_sharpe_ignores_a_stray_target_return() {
        let snapshot = two_asset_snapshot();
        let with_target = snapshot.optimize(Some(0.1), false).unwrap();
        let without = snapshot.max_sharpe().unwrap();

        assert!((with_target.sharpe_ratio.unwrap() - without.sharpe_ratio.unwrap()).abs() < 1e-9);
    }

    #[test]
    fn reported_performance_is_consistent_with_weights() {
        let snapshot = three_asset_snapshot();
        let solved = snapshot.max_sharpe().unwrap();

        let (volatility, expected_return) = snapshot.annualized_performance(&solved.weights);
        assert!((solved.volatility - volatility).abs() < 1e-12);
        assert!((solved.expected_return - expected_return).abs() < 1e-12);
    }
}
