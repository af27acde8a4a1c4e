//! Holdings weights and the efficient-frontier payload.

use paper_trade_core::Holding;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::PortfolioError;
use crate::simulate::SimulationConfig;
use crate::snapshot::ReturnsSnapshot;

/// Market-value weights of a user's current holdings.
///
/// Each weight is `quantity × latest adjusted close / total market value`,
/// returned in the holdings' order.
///
/// # Errors
/// Returns [`PortfolioError::MissingPrice`] when a held symbol has no stored
/// price and [`PortfolioError::ZeroMarketValue`] when the portfolio's total
/// value is zero; weights are never silently zeroed.
pub fn holdings_weights(
    holdings: &[Holding],
    latest_prices: &HashMap<String, Decimal>,
) -> Result<Vec<(String, f64)>, PortfolioError> {
    let mut values = Vec::with_capacity(holdings.len());
    for holding in holdings {
        let price =
            latest_prices
                .get(&holding.symbol)
                .ok_or_else(|| PortfolioError::MissingPrice {
                    symbol: holding.symbol.clone(),
                })?;
        let value = (holding.quantity * price).to_f64().unwrap_or(0.0);
        values.push((holding.symbol.clone(), value));
    }

    let total: f64 = values.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return Err(PortfolioError::ZeroMarketValue);
    }

    Ok(values
        .into_iter()
        .map(|(symbol, value)| (symbol, value / total))
        .collect())
}

/// Scatter cloud of simulated portfolios.
#[derive(Debug, Clone, Serialize)]
pub struct EfCurve {
    pub returns: Vec<f64>,
    pub volatilities: Vec<f64>,
}

/// One charted portfolio: `(volatility, annualized return)` plus its
/// weights, aligned to the payload's symbol ordering.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioPoint {
    pub performance: (f64, f64),
    pub weights: Vec<f64>,
}

/// Efficient-frontier payload consumed by the charting frontend.
#[derive(Debug, Clone, Serialize)]
pub struct PlotData {
    pub symbols: Vec<String>,
    pub ef_curve: EfCurve,
    pub user_portfolio: PortfolioPoint,
    pub max_sharpe_portfolio: PortfolioPoint,
    pub min_vol_portfolio: PortfolioPoint,
}

impl ReturnsSnapshot {
    /// Assembles the efficient-frontier payload: the simulated cloud, the
    /// user's current portfolio, and the solved maximum-Sharpe and
    /// minimum-volatility portfolios.
    ///
    /// `user_weights` must align to the snapshot's symbol ordering.
    ///
    /// # Errors
    /// Propagates simulation and solver failures; a failed solve is never
    /// papered over with the best simulated trial.
    pub fn plot_data(
        &self,
        user_weights: &[f64],
        config: &SimulationConfig,
    ) -> Result<PlotData, PortfolioError> {
        if user_weights.len() != self.num_symbols() {
            return Err(PortfolioError::WeightsMismatch {
                got: user_weights.len(),
                expected: self.num_symbols(),
            });
        }

        let trials = self.simulate(config)?;
        let ef_curve = EfCurve {
            returns: trials.iter().map(|t| t.expected_return).collect(),
            volatilities: trials.iter().map(|t| t.volatility).collect(),
        };

        let user_portfolio = PortfolioPoint {
            performance: self.annualized_performance(user_weights),
            weights: user_weights.to_vec(),
        };

        let max_sharpe = self.max_sharpe()?;
        let min_vol = self.min_volatility()?;

        Ok(PlotData {
            symbols: self.symbols().to_vec(),
            ef_curve,
            user_portfolio,
            max_sharpe_portfolio: PortfolioPoint {
                performance: (max_sharpe.volatility, max_sharpe.expected_return),
                weights: max_sharpe.weights,
            },
            min_vol_portfolio: PortfolioPoint {
                performance: (min_vol.volatility, min_vol.expected_return),
                weights: min_vol.weights,
            },
        })
    }
}
