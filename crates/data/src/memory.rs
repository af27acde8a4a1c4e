//! In-memory history store for tests and offline runs.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use paper_trade_core::{BarTable, DailyBar, QuoteBar};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::store::{DerivedRow, HistoryStore};

/// History store backed by per-table `BTreeMap`s, matching the semantics of
/// the `PostgreSQL` implementation: upsert by (symbol, date), date-ordered
/// reads, and derived fields that survive an OHLCV overwrite until the next
/// derive pass.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    tables: Mutex<HashMap<(BarTable, String), BTreeMap<NaiveDate, DailyBar>>>,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn upsert_bars(&self, table: BarTable, symbol: &str, bars: &[QuoteBar]) -> Result<u64> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let series = tables.entry((table, symbol.to_string())).or_default();

        for bar in bars {
            series
                .entry(bar.date)
                .and_modify(|existing| {
                    existing.open = bar.open;
                    existing.high = bar.high;
                    existing.low = bar.low;
                    existing.close = bar.close;
                    existing.volume = bar.volume;
                    existing.adjusted_close = bar.adjusted_close;
                })
                .or_insert_with(|| DailyBar {
                    symbol: symbol.to_string(),
                    date: bar.date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    adjusted_close: bar.adjusted_close,
                    simple_return: None,
                    log_return: None,
                    cumulative_return: None,
                });
        }

        Ok(bars.len() as u64)
    }

    async fn prune_older_than(&self, table: BarTable, cutoff: NaiveDate) -> Result<u64> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let mut removed = 0u64;

        for ((t, _), series) in tables.iter_mut() {
            if *t != table {
                continue;
            }
            let before = series.len();
            series.retain(|date, _| *date >= cutoff);
            removed += (before - series.len()) as u64;
        }

        Ok(removed)
    }

    async fn read_series(&self, table: BarTable, symbol: &str) -> Result<Vec<DailyBar>> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .get(&(table, symbol.to_string()))
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_derived(
        &self,
        table: BarTable,
        symbol: &str,
        rows: &[DerivedRow],
    ) -> Result<()> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        if let Some(series) = tables.get_mut(&(table, symbol.to_string())) {
            for row in rows {
                if let Some(bar) = series.get_mut(&row.date) {
                    bar.simple_return = row.simple_return;
                    bar.log_return = row.log_return;
                    bar.cumulative_return = row.cumulative_return;
                }
            }
        }
        Ok(())
    }

    async fn latest_adjusted_closes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Decimal>> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        let mut latest = HashMap::new();

        for symbol in symbols {
            let key = (BarTable::StockHistory, symbol.clone());
            if let Some(bar) = tables.get(&key).and_then(|series| series.values().last()) {
                latest.insert(symbol.clone(), bar.adjusted_close);
            }
        }

        Ok(latest)
    }
}
