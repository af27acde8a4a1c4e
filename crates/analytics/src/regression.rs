//! Ordinary least squares of symbol returns on benchmark returns.
//!
//! The regression runs over the inner-joined return series: slope is the
//! symbol's beta against the benchmark, intercept its alpha.

use crate::series::sanitize;
use chrono::NaiveDate;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of regressing a symbol's returns on the benchmark's.
///
/// An empty or degenerate join (no overlap, or a constant benchmark series
/// that cannot carry a slope) produces `Empty` rather than an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RegressionOutput {
    Empty,
    Fit(RegressionFit),
}

impl RegressionOutput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, RegressionOutput::Empty)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionFit {
    /// Beta: slope of symbol return on benchmark return.
    pub slope: f64,
    /// Alpha: intercept of the fitted line.
    pub intercept: f64,
    /// Pearson correlation of the joined series.
    pub correlation: Option<f64>,
    /// Two-sided p-value for slope != 0; undefined with fewer than 3 points.
    pub p_value: Option<f64>,
    /// Standard error of the slope; undefined with fewer than 3 points.
    pub std_err: Option<f64>,
    /// Number of joined observations.
    pub n_observations: usize,
    pub dates: Vec<NaiveDate>,
    pub benchmark_returns: Vec<f64>,
    pub symbol_returns: Vec<f64>,
    /// Fitted line evaluated at each benchmark return.
    pub fitted: Vec<f64>,
}

/// Runs OLS over joined `(date, symbol_return, benchmark_return)` rows.
#[must_use]
pub fn regress(joined: &[(NaiveDate, f64, f64)]) -> RegressionOutput {
    let n = joined.len();
    if n == 0 {
        return RegressionOutput::Empty;
    }

    let x: Vec<f64> = joined.iter().map(|r| r.2).collect();
    let y: Vec<f64> = joined.iter().map(|r| r.1).collect();
    let n_f = n as f64;

    let mean_x = x.iter().sum::<f64>() / n_f;
    let mean_y = y.iter().sum::<f64>() / n_f;

    let ss_xx: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
    let ss_yy: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
    let ss_xy: f64 = x
        .iter()
        .zip(&y)
        .map(|(xv, yv)| (xv - mean_x) * (yv - mean_y))
        .sum();

    if ss_xx == 0.0 {
        return RegressionOutput::Empty;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    let correlation = sanitize(ss_xy / (ss_xx * ss_yy).sqrt());

    let fitted: Vec<f64> = x.iter().map(|v| intercept + slope * v).collect();

    let (std_err, p_value) = if n > 2 {
        let dof = (n - 2) as f64;
        let residual_ss: f64 = y
            .iter()
            .zip(&fitted)
            .map(|(yv, fv)| (yv - fv).powi(2))
            .sum();
        let std_err = (residual_ss / dof / ss_xx).sqrt();

        let p_value = if std_err > 0.0 {
            let t_stat = (slope / std_err).abs();
            StudentsT::new(0.0, 1.0, dof)
                .ok()
                .and_then(|dist| sanitize(2.0 * (1.0 - dist.cdf(t_stat))))
        } else {
            // A perfect fit has zero residual: the slope is exact.
            Some(if slope == 0.0 { 1.0 } else { 0.0 })
        };

        (sanitize(std_err), p_value)
    } else {
        (None, None)
    };

    RegressionOutput::Fit(RegressionFit {
        slope,
        intercept,
        correlation,
        p_value,
        std_err,
        n_observations: n,
        dates: joined.iter().map(|r| r.0).collect(),
        benchmark_returns: x,
        symbol_returns: y,
        fitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn joined_from(pairs: &[(f64, f64)]) -> Vec<(NaiveDate, f64, f64)> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(symbol, benchmark))| (date(i as u32 + 1), symbol, benchmark))
            .collect()
    }

    #[test]
    fn empty_join_yields_explicit_empty_result() {
        let output = regress(&[]);
        assert!(output.is_empty());
    }

    #[test]
    fn constant_benchmark_yields_empty_result() {
        let joined = joined_from(&[(0.01, 0.02), (0.03, 0.02), (-0.01, 0.02)]);
        assert!(regress(&joined).is_empty());
    }

    #[test]
    fn perfectly_correlated_series_recover_slope_and_correlation() {
        // Benchmark return is exactly twice the symbol return, so regressing
        // symbol on benchmark gives slope 0.5 and correlation 1.
        let joined = joined_from(&[
            (0.01, 0.02),
            (0.02, 0.04),
            (-0.01, -0.02),
            (0.015, 0.03),
        ]);

        let RegressionOutput::Fit(fit) = regress(&joined) else {
            panic!("expected a fit");
        };

        assert!((fit.slope - 0.5).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-12);
        assert!((fit.correlation.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(fit.p_value, Some(0.0));
        assert_eq!(fit.n_observations, 4);
    }

    #[test]
    fn fitted_line_follows_slope_and_intercept() {
        let joined = joined_from(&[(0.02, 0.01), (0.05, 0.02), (0.01, 0.005), (0.06, 0.03)]);

        let RegressionOutput::Fit(fit) = regress(&joined) else {
            panic!("expected a fit");
        };

        for (i, x) in fit.benchmark_returns.iter().enumerate() {
            let expected = fit.intercept + fit.slope * x;
            assert!((fit.fitted[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn noisy_regression_has_positive_p_value_and_std_err() {
        let joined = joined_from(&[
            (0.010, 0.008),
            (-0.004, -0.006),
            (0.013, 0.011),
            (-0.009, -0.002),
            (0.002, 0.004),
            (0.007, 0.009),
        ]);

        let RegressionOutput::Fit(fit) = regress(&joined) else {
            panic!("expected a fit");
        };

        assert!(fit.std_err.unwrap() > 0.0);
        let p = fit.p_value.unwrap();
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn two_point_fit_has_no_p_value_or_std_err() {
        let joined = joined_from(&[(0.01, 0.02), (0.03, 0.05)]);

        let RegressionOutput::Fit(fit) = regress(&joined) else {
            panic!("expected a fit");
        };

        assert_eq!(fit.p_value, None);
        assert_eq!(fit.std_err, None);
    }

    #[test]
    fn regression_output_serializes_without_nan() {
        let joined = joined_from(&[(0.01, 0.02), (0.02, 0.04), (0.03, 0.06)]);
        let json = serde_json::to_string(&regress(&joined)).unwrap();
        assert!(!json.contains("NaN"));
    }
}
