//! `PostgreSQL` implementation of the history store.
//!
//! Table identifiers are never interpolated from free-form strings: every
//! bar query goes through [`BarTable::as_sql`], and all values are bound
//! parameters.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use paper_trade_core::{BarTable, DailyBar, QuoteBar};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::warn;

use crate::store::{DerivedRow, HistoryStore};

pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    /// Creates a store connected to the specified `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    /// Returns an error if a migration fails to apply.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BarRow {
    symbol: String,
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    adjusted_close: Decimal,
    simple_return: Option<f64>,
    log_return: Option<f64>,
    cumulative_return: Option<f64>,
}

impl From<BarRow> for DailyBar {
    fn from(row: BarRow) -> Self {
        DailyBar {
            symbol: row.symbol,
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            adjusted_close: row.adjusted_close,
            simple_return: row.simple_return,
            log_return: row.log_return,
            cumulative_return: row.cumulative_return,
        }
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn upsert_bars(&self, table: BarTable, symbol: &str, bars: &[QuoteBar]) -> Result<u64> {
        if bars.is_empty() {
            return Ok(0);
        }

        // Rows are written individually, outside a transaction: a bar the
        // database rejects is skipped without aborting the rest of the batch.
        let sql = format!(
            r#"
            INSERT INTO {table} (symbol, date, open, high, low, close, volume, adjusted_close)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (symbol, date) DO UPDATE SET
                open = EXCLUDED.open,
                high = EXCLUDED.high,
                low = EXCLUDED.low,
                close = EXCLUDED.close,
                volume = EXCLUDED.volume,
                adjusted_close = EXCLUDED.adjusted_close
            "#,
            table = table.as_sql()
        );

        let mut written = 0u64;
        for bar in bars {
            let result = sqlx::query(&sql)
                .bind(symbol)
                .bind(bar.date)
                .bind(bar.open)
                .bind(bar.high)
                .bind(bar.low)
                .bind(bar.close)
                .bind(bar.volume)
                .bind(bar.adjusted_close)
                .execute(&self.pool)
                .await;

            match result {
                Ok(outcome) => written += outcome.rows_affected(),
                Err(error) => {
                    warn!(symbol, date = %bar.date, %error, "skipping bar that failed to upsert");
                }
            }
        }

        Ok(written)
    }

    async fn prune_older_than(&self, table: BarTable, cutoff: NaiveDate) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE date < $1", table.as_sql());

        let result = sqlx::query(&sql)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to prune bar history")?;

        Ok(result.rows_affected())
    }

    async fn read_series(&self, table: BarTable, symbol: &str) -> Result<Vec<DailyBar>> {
        let sql = format!(
            r#"
            SELECT symbol, date, open, high, low, close, volume, adjusted_close,
                   simple_return, log_return, cumulative_return
            FROM {}
            WHERE symbol = $1
            ORDER BY date ASC
            "#,
            table.as_sql()
        );

        let rows: Vec<BarRow> = sqlx::query_as(&sql)
            .bind(symbol)
            .fetch_all(&self.pool)
            .await
            .context("Failed to read bar series")?;

        Ok(rows.into_iter().map(DailyBar::from).collect())
    }

    async fn update_derived(
        &self,
        table: BarTable,
        symbol: &str,
        rows: &[DerivedRow],
    ) -> Result<()> {
        let sql = format!(
            r#"
            UPDATE {}
            SET simple_return = $3, log_return = $4, cumulative_return = $5
            WHERE symbol = $1 AND date = $2
            "#,
            table.as_sql()
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for row in rows {
            sqlx::query(&sql)
                .bind(symbol)
                .bind(row.date)
                .bind(row.simple_return)
                .bind(row.log_return)
                .bind(row.cumulative_return)
                .execute(&mut *tx)
                .await
                .context("Failed to update derived fields")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    async fn latest_adjusted_closes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Decimal>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, Decimal)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (symbol) symbol, adjusted_close
            FROM stock_history
            WHERE symbol = ANY($1)
            ORDER BY symbol, date DESC
            "#,
        )
        .bind(symbols)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query latest adjusted closes")?;

        Ok(rows.into_iter().collect())
    }
}
