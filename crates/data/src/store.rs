use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use paper_trade_core::{BarTable, DailyBar, QuoteBar};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Derived per-bar fields written back after each refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRow {
    pub date: NaiveDate,
    pub simple_return: Option<f64>,
    pub log_return: Option<f64>,
    pub cumulative_return: Option<f64>,
}

/// Persistence contract for daily bar history.
///
/// All reads and writes of the two bar tables go through this trait; the
/// refresh service and analytics consumers never touch storage directly.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Upserts bars keyed on (symbol, date): inserts absent rows, overwrites
    /// the numeric fields of existing ones. Idempotent on identical input.
    /// A row that fails to persist is skipped and logged; it never aborts
    /// the rest of the batch.
    ///
    /// Returns the number of rows written.
    async fn upsert_bars(&self, table: BarTable, symbol: &str, bars: &[QuoteBar]) -> Result<u64>;

    /// Deletes all bars strictly older than `cutoff` from the table.
    /// Idempotent; returns the number of rows removed.
    async fn prune_older_than(&self, table: BarTable, cutoff: NaiveDate) -> Result<u64>;

    /// Reads a symbol's bars in ascending date order.
    async fn read_series(&self, table: BarTable, symbol: &str) -> Result<Vec<DailyBar>>;

    /// Writes the derived return fields for a symbol. Called after every
    /// refresh+prune cycle so derived fields always describe the currently
    /// retained window.
    async fn update_derived(
        &self,
        table: BarTable,
        symbol: &str,
        rows: &[DerivedRow],
    ) -> Result<()>;

    /// Most recent adjusted close per symbol from the stock-history table.
    /// Symbols with no stored bars are absent from the result.
    async fn latest_adjusted_closes(&self, symbols: &[String])
        -> Result<HashMap<String, Decimal>>;
}
