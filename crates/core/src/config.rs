use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub market_data: MarketDataConfig,
    pub portfolio: PortfolioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Symbol of the benchmark index kept in `benchmark_history`.
    pub benchmark_symbol: String,
    /// Rolling retention window for daily bars, in calendar days.
    pub retention_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Annual risk-free rate used in Sharpe ratios.
    pub risk_free_rate: f64,
    /// Monte-Carlo trials per efficient-frontier request.
    pub num_trials: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/paper_trade".to_string(),
                max_connections: 10,
            },
            market_data: MarketDataConfig {
                benchmark_symbol: "SPY".to_string(),
                retention_days: 5 * 365,
            },
            portfolio: PortfolioConfig {
                risk_free_rate: 0.0531,
                num_trials: 30_000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = AppConfig::default();

        assert_eq!(config.market_data.benchmark_symbol, "SPY");
        assert_eq!(config.market_data.retention_days, 1825);
        assert!((config.portfolio.risk_free_rate - 0.0531).abs() < 1e-12);
        assert_eq!(config.portfolio.num_trials, 30_000);
    }
}
