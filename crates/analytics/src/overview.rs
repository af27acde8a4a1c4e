//! Chart-ready payloads: symbol-vs-benchmark return comparison and the
//! per-symbol series overview.

use crate::series::{inner_join, sanitize, SeriesPoint};
use chrono::NaiveDate;
use paper_trade_core::DailyBar;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Padding applied above and below the observed return range on the
/// comparison chart's y-axis.
const Y_RANGE_PADDING: f64 = 0.01;

/// Histogram bounds and bin width for the simple-return distribution.
const HISTOGRAM_START: f64 = -0.1;
const HISTOGRAM_END: f64 = 0.1;
const HISTOGRAM_BIN_SIZE: f64 = 0.01;

/// Joined daily simple returns for a symbol and the benchmark.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnComparison {
    pub dates: Vec<NaiveDate>,
    pub symbol_returns: Vec<f64>,
    pub benchmark_returns: Vec<f64>,
    /// Y-axis range spanning both series' extremes with padding.
    pub y_range: (f64, f64),
}

/// Inner-joins the two simple-return series and derives the display range.
///
/// With no overlapping defined rows the series are empty and the range
/// collapses to the padding around zero.
#[must_use]
pub fn return_comparison(symbol: &[SeriesPoint], benchmark: &[SeriesPoint]) -> ReturnComparison {
    let joined = inner_join(symbol, benchmark);

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &(_, sv, bv) in &joined {
        min = min.min(sv).min(bv);
        max = max.max(sv).max(bv);
    }
    let y_range = if joined.is_empty() {
        (-Y_RANGE_PADDING, Y_RANGE_PADDING)
    } else {
        (min - Y_RANGE_PADDING, max + Y_RANGE_PADDING)
    };

    ReturnComparison {
        dates: joined.iter().map(|r| r.0).collect(),
        symbol_returns: joined.iter().map(|r| r.1).collect(),
        benchmark_returns: joined.iter().map(|r| r.2).collect(),
        y_range,
    }
}

/// Distribution of simple returns over fixed-width bins.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnHistogram {
    pub bin_start: f64,
    pub bin_size: f64,
    pub counts: Vec<u32>,
}

/// Per-symbol chart payload: price, returns, cumulative return, and the
/// simple-return distribution.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesOverview {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<Option<f64>>,
    pub simple_returns: Vec<Option<f64>>,
    pub log_returns: Vec<Option<f64>>,
    pub cumulative_returns: Vec<Option<f64>>,
    pub histogram: ReturnHistogram,
}

/// Assembles the overview payload from a date-ascending bar series.
#[must_use]
pub fn series_overview(bars: &[DailyBar]) -> SeriesOverview {
    let simple_returns: Vec<Option<f64>> = bars
        .iter()
        .map(|b| b.simple_return.and_then(sanitize))
        .collect();

    SeriesOverview {
        symbol: bars.first().map(|b| b.symbol.clone()).unwrap_or_default(),
        dates: bars.iter().map(|b| b.date).collect(),
        closes: bars
            .iter()
            .map(|b| b.close.to_f64().and_then(sanitize))
            .collect(),
        histogram: histogram(&simple_returns),
        simple_returns,
        log_returns: bars
            .iter()
            .map(|b| b.log_return.and_then(sanitize))
            .collect(),
        cumulative_returns: bars
            .iter()
            .map(|b| b.cumulative_return.and_then(sanitize))
            .collect(),
    }
}

fn histogram(simple_returns: &[Option<f64>]) -> ReturnHistogram {
    let bins = ((HISTOGRAM_END - HISTOGRAM_START) / HISTOGRAM_BIN_SIZE).round() as usize;
    let mut counts = vec![0_u32; bins];

    for value in simple_returns.iter().flatten() {
        if *value < HISTOGRAM_START || *value >= HISTOGRAM_END {
            continue;
        }
        let bin = ((value - HISTOGRAM_START) / HISTOGRAM_BIN_SIZE) as usize;
        counts[bin.min(bins - 1)] += 1;
    }

    ReturnHistogram {
        bin_start: HISTOGRAM_START,
        bin_size: HISTOGRAM_BIN_SIZE,
        counts,
    }
}
