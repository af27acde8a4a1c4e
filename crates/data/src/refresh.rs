//! Refresh service: keeps the rolling history window current.
//!
//! Each refresh prunes bars that fell out of the retention window, pulls the
//! symbol's daily series from the quote source, upserts it, and re-derives
//! the return fields from the retained window. Re-running against
//! already-current data changes nothing.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use paper_trade_analytics::{compute_cumulative_return, compute_returns};
use paper_trade_core::{BarTable, DailyBar, QuoteSource};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::store::{DerivedRow, HistoryStore};

/// Result of refreshing one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub symbol: String,
    pub pruned: u64,
    pub upserted: u64,
    /// Bars retained in the window after the refresh.
    pub retained: usize,
}

/// A symbol whose refresh failed; the rest of the batch is unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshFailure {
    pub symbol: String,
    pub error: String,
}

/// Per-batch refresh report.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub succeeded: Vec<RefreshOutcome>,
    pub failed: Vec<RefreshFailure>,
}

/// Refresh service over a history store and a quote source.
pub struct HistoryRefresher<S> {
    store: Arc<S>,
    quotes: Arc<dyn QuoteSource>,
    retention_days: i64,
    // Serializes concurrent refreshes of the same (table, symbol) so
    // interleaved partial writes cannot occur; distinct symbols proceed
    // independently.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: HistoryStore> HistoryRefresher<S> {
    #[must_use]
    pub fn new(store: Arc<S>, quotes: Arc<dyn QuoteSource>, retention_days: i64) -> Self {
        Self {
            store,
            quotes,
            retention_days,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Earliest date retained as of `today`.
    #[must_use]
    pub fn retention_cutoff(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.retention_days)
    }

    /// Refreshes one tradable symbol's history.
    ///
    /// # Errors
    /// Returns an error if the quote fetch or any store operation fails;
    /// existing rows are never corrupted by a failed refresh.
    pub async fn refresh_symbol(&self, symbol: &str) -> Result<RefreshOutcome> {
        self.refresh_symbol_as_of(symbol, Utc::now().date_naive())
            .await
    }

    /// Refreshes one tradable symbol's history with an explicit `today`.
    ///
    /// # Errors
    /// See [`HistoryRefresher::refresh_symbol`].
    pub async fn refresh_symbol_as_of(
        &self,
        symbol: &str,
        today: NaiveDate,
    ) -> Result<RefreshOutcome> {
        self.refresh_into(BarTable::StockHistory, symbol, today)
            .await
    }

    /// Refreshes the benchmark index history.
    ///
    /// # Errors
    /// See [`HistoryRefresher::refresh_symbol`].
    pub async fn refresh_benchmark(&self, symbol: &str) -> Result<RefreshOutcome> {
        self.refresh_into(BarTable::BenchmarkHistory, symbol, Utc::now().date_naive())
            .await
    }

    /// Refreshes a batch of tradable symbols. A symbol whose refresh fails
    /// is reported and skipped; the remaining symbols are unaffected.
    pub async fn refresh_all(&self, symbols: &[String]) -> RefreshReport {
        self.refresh_all_as_of(symbols, Utc::now().date_naive())
            .await
    }

    /// Batch refresh with an explicit `today`.
    pub async fn refresh_all_as_of(&self, symbols: &[String], today: NaiveDate) -> RefreshReport {
        let mut report = RefreshReport {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        for symbol in symbols {
            match self.refresh_symbol_as_of(symbol, today).await {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(error) => {
                    warn!(symbol, %error, "symbol refresh failed, continuing batch");
                    report.failed.push(RefreshFailure {
                        symbol: symbol.clone(),
                        error: format!("{error:#}"),
                    });
                }
            }
        }

        report
    }

    async fn refresh_into(
        &self,
        table: BarTable,
        symbol: &str,
        today: NaiveDate,
    ) -> Result<RefreshOutcome> {
        let _guard = self.symbol_lock(table, symbol).await;

        let cutoff = self.retention_cutoff(today);
        let pruned = self
            .store
            .prune_older_than(table, cutoff)
            .await
            .context("prune before refresh failed")?;

        let mut bars = self
            .quotes
            .fetch_daily_adjusted(symbol)
            .await
            .with_context(|| format!("quote fetch failed for {symbol}"))?;
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        bars.retain(|b| b.date >= cutoff);

        let upserted = self
            .store
            .upsert_bars(table, symbol, &bars)
            .await
            .context("bar upsert failed")?;

        let series = self
            .store
            .read_series(table, symbol)
            .await
            .context("post-upsert read failed")?;
        self.store
            .update_derived(table, symbol, &derive_rows(&series))
            .await
            .context("derived-field update failed")?;

        info!(
            symbol,
            table = table.as_sql(),
            pruned,
            upserted,
            retained = series.len(),
            "refreshed history"
        );

        Ok(RefreshOutcome {
            symbol: symbol.to_string(),
            pruned,
            upserted,
            retained: series.len(),
        })
    }

    async fn symbol_lock(&self, table: BarTable, symbol: &str) -> OwnedMutexGuard<()> {
        let key = format!("{}:{symbol}", table.as_sql());
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Derives the return fields from a date-ascending retained series.
///
/// Simple and log returns come from the adjusted close; cumulative return is
/// indexed to the window's first close, so it rebases whenever pruning drops
/// the earliest bar.
fn derive_rows(series: &[DailyBar]) -> Vec<DerivedRow> {
    let adjusted: Vec<_> = series.iter().map(|b| b.adjusted_close).collect();
    let closes: Vec<_> = series.iter().map(|b| b.close).collect();

    let pairs = compute_returns(&adjusted);
    let cumulative = compute_cumulative_return(&closes);

    series
        .iter()
        .zip(pairs)
        .zip(cumulative)
        .map(|((bar, pair), cumulative)| DerivedRow {
            date: bar.date,
            simple_return: pair.simple,
            log_return: pair.log,
            cumulative_return: cumulative,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHistoryStore;
    use async_trait::async_trait;
    use paper_trade_core::{QuoteBar, QuoteError};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn quote_bar(day: u32, close: Decimal) -> QuoteBar {
        QuoteBar {
            date: date(2024, 6, day),
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume: dec!(10000),
            adjusted_close: close,
        }
    }

    /// Serves a fixed bar list per symbol; unknown symbols fail.
    struct FixedQuoteSource {
        bars: HashMap<String, Vec<QuoteBar>>,
        fetches: AtomicUsize,
    }

    impl FixedQuoteSource {
        fn new(bars: HashMap<String, Vec<QuoteBar>>) -> Self {
            Self {
                bars,
                fetches: AtomicUsize::new(0),
            }
        }

        fn single(symbol: &str, bars: Vec<QuoteBar>) -> Self {
            Self::new(HashMap::from([(symbol.to_string(), bars)]))
        }
    }

    #[async_trait]
    impl QuoteSource for FixedQuoteSource {
        async fn fetch_daily_adjusted(&self, symbol: &str) -> Result<Vec<QuoteBar>, QuoteError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| QuoteError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
        }
    }

    fn refresher(
        store: Arc<MemoryHistoryStore>,
        quotes: FixedQuoteSource,
    ) -> HistoryRefresher<MemoryHistoryStore> {
        HistoryRefresher::new(store, Arc::new(quotes), 5 * 365)
    }

    const TODAY: fn() -> NaiveDate = || date(2024, 6, 30);

    #[tokio::test]
    async fn refresh_stores_sorted_bars_with_derived_fields() {
        let store = Arc::new(MemoryHistoryStore::new());
        // Newest-first input: the refresher must sort before deriving.
        let quotes = FixedQuoteSource::single(
            "AAPL",
            vec![
                quote_bar(5, dec!(99)),
                quote_bar(3, dec!(100)),
                quote_bar(4, dec!(110)),
            ],
        );
        let refresher = refresher(Arc::clone(&store), quotes);

        let outcome = refresher
            .refresh_symbol_as_of("AAPL", TODAY())
            .await
            .unwrap();
        assert_eq!(outcome.upserted, 3);
        assert_eq!(outcome.retained, 3);

        let series = store
            .read_series(BarTable::StockHistory, "AAPL")
            .await
            .unwrap();
        assert_eq!(
            series.iter().map(|b| b.date).collect::<Vec<_>>(),
            vec![date(2024, 6, 3), date(2024, 6, 4), date(2024, 6, 5)]
        );

        assert_eq!(series[0].simple_return, None);
        assert!((series[1].simple_return.unwrap() - 0.10).abs() < 1e-12);
        assert_eq!(series[0].cumulative_return, Some(0.0));
        assert!((series[2].cumulative_return.unwrap() - (-0.01)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let store = Arc::new(MemoryHistoryStore::new());
        let quotes = FixedQuoteSource::single(
            "AAPL",
            vec![quote_bar(3, dec!(100)), quote_bar(4, dec!(110))],
        );
        let refresher = refresher(Arc::clone(&store), quotes);

        refresher
            .refresh_symbol_as_of("AAPL", TODAY())
            .await
            .unwrap();
        let first = store
            .read_series(BarTable::StockHistory, "AAPL")
            .await
            .unwrap();

        refresher
            .refresh_symbol_as_of("AAPL", TODAY())
            .await
            .unwrap();
        let second = store
            .read_series(BarTable::StockHistory, "AAPL")
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn refresh_prunes_and_rebases_cumulative_return() {
        let store = Arc::new(MemoryHistoryStore::new());
        let quotes = FixedQuoteSource::single(
            "AAPL",
            vec![
                quote_bar(3, dec!(100)),
                quote_bar(4, dec!(110)),
                quote_bar(5, dec!(121)),
            ],
        );
        let refresher = HistoryRefresher::new(Arc::clone(&store), Arc::new(quotes), 5 * 365);

        refresher
            .refresh_symbol_as_of("AAPL", TODAY())
            .await
            .unwrap();

        // Shrink the window so the first bar falls out, then refresh with a
        // source that no longer serves it.
        let tight = HistoryRefresher::new(
            Arc::clone(&store),
            Arc::new(FixedQuoteSource::single(
                "AAPL",
                vec![quote_bar(4, dec!(110)), quote_bar(5, dec!(121))],
            )),
            26,
        );
        let outcome = tight.refresh_symbol_as_of("AAPL", TODAY()).await.unwrap();
        assert_eq!(outcome.pruned, 1);

        let series = store
            .read_series(BarTable::StockHistory, "AAPL")
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        // Cumulative return is now indexed to the new window origin at 110.
        assert_eq!(series[0].cumulative_return, Some(0.0));
        assert!((series[1].cumulative_return.unwrap() - 0.10).abs() < 1e-12);
        // The new first bar's simple return is undefined again.
        assert_eq!(series[0].simple_return, None);
    }

    #[tokio::test]
    async fn refresh_drops_bars_older_than_retention() {
        let store = Arc::new(MemoryHistoryStore::new());
        let quotes = FixedQuoteSource::single(
            "AAPL",
            vec![
                QuoteBar {
                    date: date(2015, 1, 2),
                    ..quote_bar(1, dec!(50))
                },
                quote_bar(4, dec!(110)),
            ],
        );
        let refresher = refresher(Arc::clone(&store), quotes);

        refresher
            .refresh_symbol_as_of("AAPL", TODAY())
            .await
            .unwrap();

        let series = store
            .read_series(BarTable::StockHistory, "AAPL")
            .await
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, date(2024, 6, 4));
    }

    #[tokio::test]
    async fn batch_refresh_isolates_failing_symbols() {
        let store = Arc::new(MemoryHistoryStore::new());
        let quotes = FixedQuoteSource::new(HashMap::from([
            ("AAPL".to_string(), vec![quote_bar(3, dec!(100))]),
            ("MSFT".to_string(), vec![quote_bar(3, dec!(300))]),
        ]));
        let refresher = refresher(Arc::clone(&store), quotes);

        let report = refresher
            .refresh_all_as_of(
                &[
                    "AAPL".to_string(),
                    "NOPE".to_string(),
                    "MSFT".to_string(),
                ],
                TODAY(),
            )
            .await;

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].symbol, "NOPE");

        // The failure did not disturb the other symbols' rows.
        let msft = store
            .read_series(BarTable::StockHistory, "MSFT")
            .await
            .unwrap();
        assert_eq!(msft.len(), 1);
    }

    #[tokio::test]
    async fn benchmark_refresh_writes_to_benchmark_table() {
        let store = Arc::new(MemoryHistoryStore::new());
        let quotes = FixedQuoteSource::single(
            "SPY",
            vec![quote_bar(3, dec!(500)), quote_bar(4, dec!(505))],
        );
        let refresher = HistoryRefresher::new(Arc::clone(&store), Arc::new(quotes), 5 * 365);

        refresher.refresh_benchmark("SPY").await.unwrap();

        let benchmark = store
            .read_series(BarTable::BenchmarkHistory, "SPY")
            .await
            .unwrap();
        let stock = store
            .read_series(BarTable::StockHistory, "SPY")
            .await
            .unwrap();
        assert_eq!(benchmark.len(), 2);
        assert!(stock.is_empty());
    }
}
