//! Rolling indicators over daily bar series: annualized volatility, Wilder
//! RSI, and simple moving averages.

use crate::series::sanitize;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Trading days per year, used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Rolling window for historical volatility, in trading days.
pub const DEFAULT_VOLATILITY_WINDOW: usize = 30;

/// Default RSI lookback, in trading days.
pub const DEFAULT_RSI_WINDOW: usize = 14;

/// Moving-average windows shown on the price chart.
pub const MA_WINDOWS: [usize; 3] = [10, 50, 200];

/// RSI display reference level below which a symbol reads as oversold.
pub const RSI_OVERSOLD: f64 = 30.0;

/// RSI display reference level above which a symbol reads as overbought.
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Rolling annualized volatility over a simple-return series.
///
/// Sample standard deviation over each `window`-bar span, scaled by √252.
/// A position is defined only once `window` consecutive defined returns are
/// available, so the first `window - 1` outputs are `None`, as is any span
/// containing an undefined return (e.g. the series' first bar).
#[must_use]
pub fn rolling_volatility(simple_returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = simple_returns.len();
    if window < 2 {
        return vec![None; n];
    }

    (0..n)
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let span = &simple_returns[i + 1 - window..=i];
            let values: Vec<f64> = span.iter().copied().collect::<Option<Vec<f64>>>()?;
            sanitize(sample_std_dev(&values) * TRADING_DAYS_PER_YEAR.sqrt())
        })
        .collect()
}

/// Sample standard deviation (n-1 denominator).
fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Wilder-style RSI series with its display reference levels.
#[derive(Debug, Clone, Serialize)]
pub struct RsiSeries {
    pub window: usize,
    pub values: Vec<Option<f64>>,
    pub oversold: f64,
    pub overbought: f64,
}

/// Relative Strength Index over an ordered close series.
///
/// Average gain and loss are rolling means of the positive/negative daily
/// price changes, using however much history is available while the window
/// fills (minimum-periods-1 semantics). RS = avg_gain / avg_loss and
/// RSI = 100 - 100 / (1 + RS), clamped to [0, 100]. The first bar has no
/// price change: both averages are zero there and the output is undefined.
/// An all-gain span pins RSI at 100, an all-loss span at 0.
#[must_use]
pub fn rsi(closes: &[Decimal], window: usize) -> RsiSeries {
    let closes: Vec<Option<f64>> = closes.iter().map(ToPrimitive::to_f64).collect();
    let n = closes.len();
    let window = window.max(1);

    let mut gains = vec![0.0_f64; n];
    let mut losses = vec![0.0_f64; n];
    for i in 1..n {
        if let (Some(prev), Some(curr)) = (closes[i - 1], closes[i]) {
            let change = curr - prev;
            if change > 0.0 {
                gains[i] = change;
            } else if change < 0.0 {
                losses[i] = -change;
            }
        }
    }

    let values = (0..n)
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let span = i + 1 - start;
            let avg_gain = gains[start..=i].iter().sum::<f64>() / span as f64;
            let avg_loss = losses[start..=i].iter().sum::<f64>() / span as f64;

            if avg_loss == 0.0 {
                // No losses in the span: RS diverges. The value is pinned at
                // 100 when there was any gain, and undefined when the span
                // saw no movement at all (including the first bar).
                if avg_gain > 0.0 {
                    Some(100.0)
                } else {
                    None
                }
            } else {
                let rs = avg_gain / avg_loss;
                sanitize((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
            }
        })
        .collect();

    RsiSeries {
        window,
        values,
        oversold: RSI_OVERSOLD,
        overbought: RSI_OVERBOUGHT,
    }
}

/// One simple-moving-average series over the close price.
#[derive(Debug, Clone, Serialize)]
pub struct MovingAverageSeries {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

/// Simple moving averages over the close series, one per requested window.
///
/// Each series is undefined until its window has filled.
#[must_use]
pub fn moving_averages(closes: &[Decimal], windows: &[usize]) -> Vec<MovingAverageSeries> {
    let closes: Vec<Option<f64>> = closes.iter().map(ToPrimitive::to_f64).collect();

    windows
        .iter()
        .map(|&window| MovingAverageSeries {
            window,
            values: simple_moving_average(&closes, window),
        })
        .collect()
}

fn simple_moving_average(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    if window == 0 {
        return vec![None; n];
    }

    (0..n)
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let span: Vec<f64> = closes[i + 1 - window..=i]
                .iter()
                .copied()
                .collect::<Option<Vec<f64>>>()?;
            sanitize(span.iter().sum::<f64>() / window as f64)
        })
        .collect()
}
