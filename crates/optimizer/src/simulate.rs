//! Monte-Carlo random-weight simulation over a returns snapshot.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::PortfolioError;
use crate::snapshot::ReturnsSnapshot;

/// Trading days per year, used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Configuration for Monte-Carlo simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of random portfolios to draw.
    pub num_trials: usize,
    /// Optional seed for reproducible results.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_trials: 30_000,
            seed: None,
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn new(num_trials: usize) -> Self {
        Self {
            num_trials,
            ..Default::default()
        }
    }

    /// Sets a seed for reproducible simulations.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// One random portfolio trial.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedTrial {
    /// Weights aligned to the snapshot's symbol ordering.
    pub weights: Vec<f64>,
    pub volatility: f64,
    pub expected_return: f64,
    pub sharpe_ratio: f64,
}

impl ReturnsSnapshot {
    /// Draws random portfolios and records their annualized performance.
    ///
    /// Each trial draws one uniform[0,1) value per symbol and divides by the
    /// sum, so every weight lies in [0,1] and the vector sums to 1. This is
    /// the inherited sampling procedure, not a uniform distribution over the
    /// simplex; it biases trials toward the simplex interior and shapes the
    /// frontier cloud accordingly.
    ///
    /// # Errors
    /// Returns [`PortfolioError::ZeroVolatility`] if a trial's volatility is
    /// zero; its Sharpe ratio would be undefined.
    pub fn simulate(
        &self,
        config: &SimulationConfig,
    ) -> Result<Vec<SimulatedTrial>, PortfolioError> {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let n = self.num_symbols();
        let mut trials = Vec::with_capacity(config.num_trials);

        for _ in 0..config.num_trials {
            let mut weights: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
            let total: f64 = weights.iter().sum();
            for w in &mut weights {
                *w /= total;
            }

            let (volatility, expected_return) = self.annualized_performance(&weights);
            if volatility == 0.0 {
                return Err(PortfolioError::ZeroVolatility);
            }
            let sharpe_ratio = (expected_return - self.risk_free_rate()) / volatility;

            trials.push(SimulatedTrial {
                weights,
                volatility,
                expected_return,
                sharpe_ratio,
            });
        }

        Ok(trials)
    }
}
