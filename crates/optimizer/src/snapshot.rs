//! Immutable return-statistics snapshot for one optimization request.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use paper_trade_core::DailyBar;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

use crate::errors::PortfolioError;
use crate::simulate::TRADING_DAYS_PER_YEAR;

/// Minimum complete return rows needed for a sample covariance.
const MIN_RETURN_ROWS: usize = 2;

/// One symbol's dated adjusted-close series.
#[derive(Debug, Clone)]
pub struct SymbolHistory {
    pub symbol: String,
    pub closes: Vec<(NaiveDate, Decimal)>,
}

impl SymbolHistory {
    /// Extracts the adjusted-close series from a date-ascending bar series.
    #[must_use]
    pub fn from_daily_bars(bars: &[DailyBar]) -> Self {
        Self {
            symbol: bars.first().map(|b| b.symbol.clone()).unwrap_or_default(),
            closes: bars.iter().map(|b| (b.date, b.adjusted_close)).collect(),
        }
    }
}

/// Return statistics over the joined history of a set of symbols.
///
/// Construction pivots the series into a date × symbol price matrix, takes
/// percent-change returns, and drops any row where a symbol is missing.
/// The snapshot is immutable afterwards: every method is a pure read, and
/// the symbol ordering fixed here aligns every weights vector.
#[derive(Debug, Clone)]
pub struct ReturnsSnapshot {
    symbols: Vec<String>,
    returns: DMatrix<f64>,
    mean_returns: DVector<f64>,
    covariance: DMatrix<f64>,
    risk_free_rate: f64,
}

impl ReturnsSnapshot {
    /// Builds a snapshot from per-symbol adjusted-close series.
    ///
    /// # Errors
    /// Returns an error if no symbols are given or fewer than two joined
    /// return rows survive the pivot.
    pub fn from_series(
        series: Vec<SymbolHistory>,
        risk_free_rate: f64,
    ) -> Result<Self, PortfolioError> {
        if series.is_empty() {
            return Err(PortfolioError::NoSymbols);
        }

        let symbols: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
        let n = symbols.len();

        let dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.closes.iter().map(|(d, _)| *d))
            .collect();
        let dates: Vec<NaiveDate> = dates.into_iter().collect();

        // date × symbol price pivot; None where a symbol has no bar.
        let by_symbol: Vec<HashMap<NaiveDate, f64>> = series
            .iter()
            .map(|s| {
                s.closes
                    .iter()
                    .filter_map(|(d, c)| c.to_f64().map(|c| (*d, c)))
                    .collect()
            })
            .collect();
        let prices: Vec<Vec<Option<f64>>> = dates
            .iter()
            .map(|d| by_symbol.iter().map(|m| m.get(d).copied()).collect())
            .collect();

        // Percent-change returns; a row survives only when every symbol has
        // a defined return for it.
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for t in 1..prices.len() {
            let row: Option<Vec<f64>> = (0..n)
                .map(|j| match (prices[t - 1][j], prices[t][j]) {
                    (Some(prev), Some(curr)) if prev > 0.0 => {
                        let r = (curr - prev) / prev;
                        r.is_finite().then_some(r)
                    }
                    _ => None,
                })
                .collect();
            if let Some(row) = row {
                rows.push(row);
            }
        }

        if rows.len() < MIN_RETURN_ROWS {
            return Err(PortfolioError::NotEnoughData {
                rows: rows.len(),
                min: MIN_RETURN_ROWS,
            });
        }

        let t = rows.len();
        let returns = DMatrix::from_fn(t, n, |i, j| rows[i][j]);

        let mean_returns = DVector::from_fn(n, |j, _| returns.column(j).sum() / t as f64);

        // Sample covariance (n-1 denominator).
        let covariance = DMatrix::from_fn(n, n, |i, j| {
            let (mi, mj) = (mean_returns[i], mean_returns[j]);
            returns
                .column(i)
                .iter()
                .zip(returns.column(j).iter())
                .map(|(a, b)| (a - mi) * (b - mj))
                .sum::<f64>()
                / (t - 1) as f64
        });

        Ok(Self {
            symbols,
            returns,
            mean_returns,
            covariance,
            risk_free_rate,
        })
    }

    /// Symbol ordering every weights vector aligns to.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn num_return_rows(&self) -> usize {
        self.returns.nrows()
    }

    #[must_use]
    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    #[must_use]
    pub fn mean_returns(&self) -> &DVector<f64> {
        &self.mean_returns
    }

    #[must_use]
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Annualized `(volatility, expected_return)` of a weighted portfolio:
    /// `return = 252 · (μ · w)` and `volatility = √252 · √(wᵀ Σ w)`.
    ///
    /// # Panics
    /// Panics if `weights` does not match the snapshot's symbol count.
    #[must_use]
    pub fn annualized_performance(&self, weights: &[f64]) -> (f64, f64) {
        assert_eq!(
            weights.len(),
            self.num_symbols(),
            "weights must align to the snapshot's symbols"
        );
        let w = DVector::from_column_slice(weights);

        let expected_return = TRADING_DAYS_PER_YEAR * self.mean_returns.dot(&w);
        let variance = (&w.transpose() * &self.covariance * &w)[(0, 0)];
        let volatility = TRADING_DAYS_PER_YEAR.sqrt() * variance.max(0.0).sqrt();

        (volatility, expected_return)
    }
}
