//! Holdings repository.
//!
//! A holding exists only while its quantity is positive: the first buy
//! inserts the row, later buys and sells adjust it, and a sell that empties
//! the position deletes it. Cash-balance bookkeeping lives outside this
//! crate.

use anyhow::{bail, Context, Result};
use paper_trade_core::Holding;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Repository for per-user holdings.
#[derive(Debug, Clone)]
pub struct HoldingsRepository {
    pool: PgPool,
}

impl HoldingsRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a user's holdings ordered by symbol.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn holdings_for_user(&self, user_id: i64) -> Result<Vec<Holding>> {
        let rows: Vec<(i64, String, Decimal)> = sqlx::query_as(
            r#"
            SELECT user_id, symbol, quantity
            FROM user_holdings
            WHERE user_id = $1
            ORDER BY symbol
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query holdings")?;

        Ok(rows
            .into_iter()
            .map(|(user_id, symbol, quantity)| Holding {
                user_id,
                symbol,
                quantity,
            })
            .collect())
    }

    /// Returns the distinct symbols a user holds, ordered.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn user_symbols(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT symbol
            FROM user_holdings
            WHERE user_id = $1
            ORDER BY symbol
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query user symbols")?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Records a buy: inserts the holding on first purchase, otherwise
    /// increments its quantity.
    ///
    /// # Errors
    /// Returns an error if `quantity` is not positive or the write fails.
    pub async fn apply_buy(&self, user_id: i64, symbol: &str, quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            bail!("buy quantity must be positive, got {quantity}");
        }

        sqlx::query(
            r#"
            INSERT INTO user_holdings (user_id, symbol, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, symbol) DO UPDATE SET
                quantity = user_holdings.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .context("Failed to record buy")?;

        Ok(())
    }

    /// Records a sell: decrements the holding, deleting it when the quantity
    /// reaches zero.
    ///
    /// # Errors
    /// Returns an error if `quantity` is not positive, the user does not
    /// hold the symbol, the position is smaller than the sale, or the write
    /// fails.
    pub async fn apply_sell(&self, user_id: i64, symbol: &str, quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            bail!("sell quantity must be positive, got {quantity}");
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let held: Option<(Decimal,)> = sqlx::query_as(
            r#"
            SELECT quantity FROM user_holdings
            WHERE user_id = $1 AND symbol = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to read holding")?;

        let Some((held,)) = held else {
            bail!("user {user_id} holds no {symbol}");
        };
        if held < quantity {
            bail!("cannot sell {quantity} {symbol}: only {held} held");
        }

        let remaining = held - quantity;
        if remaining.is_zero() {
            sqlx::query("DELETE FROM user_holdings WHERE user_id = $1 AND symbol = $2")
                .bind(user_id)
                .bind(symbol)
                .execute(&mut *tx)
                .await
                .context("Failed to delete emptied holding")?;
        } else {
            sqlx::query(
                "UPDATE user_holdings SET quantity = $3 WHERE user_id = $1 AND symbol = $2",
            )
            .bind(user_id)
            .bind(symbol)
            .bind(remaining)
            .execute(&mut *tx)
            .await
            .context("Failed to update holding")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}
