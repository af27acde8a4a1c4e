//! CSV-backed quote source for offline refreshes.
//!
//! Reads `<dir>/<SYMBOL>.csv` with the columns
//! `date,open,high,low,close,volume,adjusted_close`. Row order does not
//! matter; the refresh service sorts explicitly.

use async_trait::async_trait;
use chrono::NaiveDate;
use paper_trade_core::{QuoteBar, QuoteError, QuoteSource};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvQuoteSource {
    dir: PathBuf,
}

impl CsvQuoteSource {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn read_file(&self, symbol: &str) -> Result<Vec<QuoteBar>, QuoteError> {
        let path = self.dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(QuoteError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| QuoteError::Transport(format!("failed to open {}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| QuoteError::Malformed(format!("bad CSV record: {e}")))?;
            if record.len() != 7 {
                return Err(QuoteError::Malformed(format!(
                    "expected 7 columns, got {}",
                    record.len()
                )));
            }

            let date = NaiveDate::from_str(&record[0])
                .map_err(|e| QuoteError::Malformed(format!("bad date {}: {e}", &record[0])))?;
            let field = |i: usize| -> Result<Decimal, QuoteError> {
                Decimal::from_str(&record[i])
                    .map_err(|e| QuoteError::Malformed(format!("bad number {}: {e}", &record[i])))
            };

            bars.push(QuoteBar {
                date,
                open: field(1)?,
                high: field(2)?,
                low: field(3)?,
                close: field(4)?,
                volume: field(5)?,
                adjusted_close: field(6)?,
            });
        }

        Ok(bars)
    }
}

#[async_trait]
impl QuoteSource for CsvQuoteSource {
    async fn fetch_daily_adjusted(&self, symbol: &str) -> Result<Vec<QuoteBar>, QuoteError> {
        self.read_file(symbol)
    }
}
