use thiserror::Error;

/// Errors from portfolio statistics and simulation.
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// The joined price history has too few complete rows to estimate
    /// return statistics.
    #[error("not enough joined history: {rows} complete return rows, need at least {min}")]
    NotEnoughData { rows: usize, min: usize },

    /// The snapshot was constructed with no symbols.
    #[error("no symbols to optimize")]
    NoSymbols,

    /// A trial or portfolio has zero volatility; its Sharpe ratio is
    /// undefined rather than infinite.
    #[error("zero-volatility portfolio: Sharpe ratio is undefined")]
    ZeroVolatility,

    /// Holdings have zero total market value; weights are undefined.
    #[error("total market value is zero")]
    ZeroMarketValue,

    /// A held symbol has no stored price.
    #[error("no latest price for held symbol {symbol}")]
    MissingPrice { symbol: String },

    /// A weights vector does not match the snapshot's symbol ordering.
    #[error("weights length {got} does not match symbol count {expected}")]
    WeightsMismatch { got: usize, expected: usize },

    /// Constrained optimization failed.
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Errors from the constrained solver.
///
/// A failed solve is surfaced as such; the initial guess is never returned
/// as if it were a solution.
#[derive(Error, Debug)]
pub enum OptimizeError {
    /// The solver hit its iteration cap before the iterates settled or
    /// stopped at a point that violates the constraints.
    #[error("solver failed to converge after {iterations} iterations (residual {residual:.3e})")]
    NoConvergence { iterations: usize, residual: f64 },

    /// No weight vector in [0,1]^n summing to 1 can reach the requested
    /// annualized return.
    #[error("target return {target} is outside the achievable range [{min:.6}, {max:.6}]")]
    InfeasibleTarget { target: f64, min: f64, max: f64 },
}
