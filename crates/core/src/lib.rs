//! Core types, contracts, and configuration for the paper-trade engine.
//!
//! This crate provides:
//! - Domain types for daily bars and user holdings
//! - The quote-source contract implemented by market-data adapters
//! - Application configuration with figment-based loading

pub mod config;
pub mod config_loader;
pub mod errors;
pub mod traits;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, MarketDataConfig, PortfolioConfig};
pub use config_loader::ConfigLoader;
pub use errors::QuoteError;
pub use traits::QuoteSource;
pub use types::{BarTable, DailyBar, Holding, QuoteBar};
