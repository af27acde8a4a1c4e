//! Return derivation and chart analytics for the paper-trade engine.
//!
//! Everything in this crate is a pure function over bar series read from the
//! history store. Outputs are JSON-serializable structs in which every value
//! that can be undefined is an `Option<f64>`; non-finite floats are mapped to
//! `None` before they leave this crate, so NaN never reaches a caller.

pub mod indicators;
pub mod overview;
pub mod regression;
pub mod returns;
pub mod series;

pub use indicators::{
    moving_averages, rolling_volatility, rsi, MovingAverageSeries, RsiSeries,
    DEFAULT_RSI_WINDOW, DEFAULT_VOLATILITY_WINDOW, MA_WINDOWS, TRADING_DAYS_PER_YEAR,
};
pub use overview::{return_comparison, series_overview, ReturnComparison, SeriesOverview};
pub use regression::{regress, RegressionFit, RegressionOutput};
pub use returns::{compute_cumulative_return, compute_returns, ReturnPair};
pub use series::{inner_join, sanitize, simple_return_points, SeriesPoint};
