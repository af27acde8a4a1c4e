//! Simple, log, and cumulative return derivation.
//!
//! These run after every refresh+prune cycle so the stored derived fields
//! always describe the currently retained window.

use crate::series::sanitize;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Simple and log return for one bar relative to the previous retained bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPair {
    pub simple: Option<f64>,
    pub log: Option<f64>,
}

impl ReturnPair {
    const UNDEFINED: ReturnPair = ReturnPair {
        simple: None,
        log: None,
    };
}

/// Computes simple and log returns over an ordered adjusted-close series.
///
/// The first element has no prior bar and is undefined (`None`, never zero).
/// `simple[t] = (close[t] - close[t-1]) / close[t-1]`,
/// `log[t] = ln(close[t] / close[t-1])`.
#[must_use]
pub fn compute_returns(adjusted_closes: &[Decimal]) -> Vec<ReturnPair> {
    let closes: Vec<Option<f64>> = adjusted_closes.iter().map(ToPrimitive::to_f64).collect();

    closes
        .iter()
        .enumerate()
        .map(|(i, curr)| {
            if i == 0 {
                return ReturnPair::UNDEFINED;
            }
            match (closes[i - 1], curr) {
                (Some(prev), Some(curr)) if prev > 0.0 => ReturnPair {
                    simple: sanitize((curr - prev) / prev),
                    log: sanitize((curr / prev).ln()),
                },
                _ => ReturnPair::UNDEFINED,
            }
        })
        .collect()
}

/// Computes cumulative return over an ordered close series, indexed to the
/// first element of the currently retained window.
///
/// Element 0 is defined as 0 by construction; element t is
/// `(close[t] - close[0]) / close[0]`. Because the base is the earliest
/// *retained* bar, the series silently rebases whenever retention pruning
/// drops the window's first bar. That behavior is deliberate and covered by
/// tests; do not "fix" it by pinning a historical origin.
#[must_use]
pub fn compute_cumulative_return(closes: &[Decimal]) -> Vec<Option<f64>> {
    let base = closes.first().and_then(ToPrimitive::to_f64);

    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            if i == 0 {
                return Some(0.0);
            }
            match (base, close.to_f64()) {
                (Some(base), Some(curr)) if base > 0.0 => sanitize((curr - base) / base),
                _ => None,
            }
        })
        .collect()
}
