use chrono::NaiveDate;
use paper_trade_core::DailyBar;
use serde::Serialize;
use std::collections::HashMap;

/// Maps non-finite floats to `None`.
///
/// Every value produced by this crate passes through here before reaching a
/// caller; NaN and infinity must not cross the crate boundary.
#[must_use]
pub fn sanitize(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// One dated observation of a possibly-undefined value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl SeriesPoint {
    #[must_use]
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self {
            date,
            value: value.and_then(sanitize),
        }
    }
}

/// Inner-joins two series on date, keeping only rows where both sides have a
/// defined value. Output preserves the left series' date order.
#[must_use]
pub fn inner_join(left: &[SeriesPoint], right: &[SeriesPoint]) -> Vec<(NaiveDate, f64, f64)> {
    let right_by_date: HashMap<NaiveDate, f64> = right
        .iter()
        .filter_map(|p| p.value.map(|v| (p.date, v)))
        .collect();

    left.iter()
        .filter_map(|p| {
            let lv = p.value?;
            let rv = *right_by_date.get(&p.date)?;
            Some((p.date, lv, rv))
        })
        .collect()
}

/// Extracts the stored simple-return series from a bar sequence.
#[must_use]
pub fn simple_return_points(bars: &[DailyBar]) -> Vec<SeriesPoint> {
    bars.iter()
        .map(|b| SeriesPoint::new(b.date, b.simple_return))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn sanitize_rejects_non_finite() {
        assert_eq!(sanitize(1.5), Some(1.5));
        assert_eq!(sanitize(f64::NAN), None);
        assert_eq!(sanitize(f64::INFINITY), None);
        assert_eq!(sanitize(f64::NEG_INFINITY), None);
    }

    #[test]
    fn series_point_sanitizes_on_construction() {
        let p = SeriesPoint::new(date(2), Some(f64::NAN));
        assert_eq!(p.value, None);
    }

    #[test]
    fn inner_join_drops_unmatched_and_undefined_rows() {
        let left = vec![
            SeriesPoint::new(date(1), Some(0.01)),
            SeriesPoint::new(date(2), None),
            SeriesPoint::new(date(3), Some(0.03)),
            SeriesPoint::new(date(4), Some(0.04)),
        ];
        let right = vec![
            SeriesPoint::new(date(1), Some(0.10)),
            SeriesPoint::new(date(2), Some(0.20)),
            SeriesPoint::new(date(3), None),
            SeriesPoint::new(date(5), Some(0.50)),
        ];

        let joined = inner_join(&left, &right);
        assert_eq!(joined, vec![(date(1), 0.01, 0.10)]);
    }

    #[test]
    fn inner_join_of_disjoint_series_is_empty() {
        let left = vec![SeriesPoint::new(date(1), Some(0.01))];
        let right = vec![SeriesPoint::new(date(2), Some(0.02))];
        assert!(inner_join(&left, &right).is_empty());
    }
}
