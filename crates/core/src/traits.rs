use crate::errors::QuoteError;
use crate::types::QuoteBar;
use async_trait::async_trait;

/// External source of daily adjusted OHLCV series.
///
/// Implementations may return bars newest-first or oldest-first; consumers
/// sort explicitly before use.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_daily_adjusted(&self, symbol: &str) -> Result<Vec<QuoteBar>, QuoteError>;
}
