//! History store and refresh service for the paper-trade engine.
//!
//! This crate provides:
//! - The `HistoryStore` contract through which all bar persistence flows
//! - A `PostgreSQL` implementation of that contract
//! - An in-memory implementation for tests and offline runs
//! - The holdings repository
//! - The refresh service that keeps the rolling history window current

pub mod holdings;
pub mod memory;
pub mod postgres;
pub mod refresh;
pub mod store;

pub use holdings::HoldingsRepository;
pub use memory::MemoryHistoryStore;
pub use postgres::PostgresHistoryStore;
pub use refresh::{HistoryRefresher, RefreshFailure, RefreshOutcome, RefreshReport};
pub use store::{DerivedRow, HistoryStore};
