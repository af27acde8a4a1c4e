//! Monte-Carlo mean-variance portfolio optimizer.
//!
//! A [`ReturnsSnapshot`] is built once per request from the joined
//! adjusted-close history of a user's held symbols and is immutable
//! afterwards; simulation, optimization, and performance calls are pure
//! reads of that snapshot.

pub mod errors;
pub mod portfolio;
pub mod simulate;
pub mod snapshot;
pub mod solve;

pub use errors::{OptimizeError, PortfolioError};
pub use portfolio::{holdings_weights, EfCurve, PlotData, PortfolioPoint};
pub use simulate::{SimulatedTrial, SimulationConfig};
pub use snapshot::{ReturnsSnapshot, SymbolHistory};
pub use solve::OptimizedPortfolio;
