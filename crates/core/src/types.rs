use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One stored daily bar for a symbol, including derived return fields.
///
/// At most one bar exists per (symbol, date). The derived fields are
/// recomputed after every refresh+prune cycle so they always describe the
/// currently retained window: `simple_return` and `log_return` are relative
/// to the chronologically previous retained bar (`None` on the earliest bar),
/// and `cumulative_return` is relative to the earliest retained bar's close
/// (0 on that bar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub adjusted_close: Decimal,
    pub simple_return: Option<f64>,
    pub log_return: Option<f64>,
    pub cumulative_return: Option<f64>,
}

/// One raw daily bar as delivered by a quote source, before any derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub adjusted_close: Decimal,
}

/// A user's position in one symbol.
///
/// Quantity is strictly positive; a holding whose quantity reaches zero is
/// deleted rather than stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub user_id: i64,
    pub symbol: String,
    pub quantity: Decimal,
}

/// The two bar tables maintained by the history store.
///
/// SQL identifiers are never interpolated from free-form strings; every
/// query that targets a bar table goes through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarTable {
    /// Daily history for tradable symbols.
    StockHistory,
    /// Daily history for the benchmark index.
    BenchmarkHistory,
}

impl BarTable {
    /// Returns the SQL table name.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            BarTable::StockHistory => "stock_history",
            BarTable::BenchmarkHistory => "benchmark_history",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bar_table_names_are_fixed() {
        assert_eq!(BarTable::StockHistory.as_sql(), "stock_history");
        assert_eq!(BarTable::BenchmarkHistory.as_sql(), "benchmark_history");
    }

    #[test]
    fn daily_bar_serializes_none_returns_as_null() {
        let bar = DailyBar {
            symbol: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100.5),
            volume: dec!(1000),
            adjusted_close: dec!(100.5),
            simple_return: None,
            log_return: None,
            cumulative_return: Some(0.0),
        };

        let json = serde_json::to_value(&bar).unwrap();
        assert!(json["simple_return"].is_null());
        assert!(json["log_return"].is_null());
        assert_eq!(json["cumulative_return"], 0.0);
    }
}
