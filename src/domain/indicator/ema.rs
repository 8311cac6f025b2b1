//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first source value, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::{Bar, PriceSource};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_ema(bars: &[Bar], period: usize, source: PriceSource) -> IndicatorSeries {
    let indicator_type = IndicatorType::Ema { period, source };
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }

    let k = 2.0 / (period as f64 + 1.0);
    let prices: Vec<f64> = bars.iter().map(|b| source.of(b)).collect();
    let smoothed = smooth(&prices, k);

    let values = bars
        .iter()
        .zip(smoothed)
        .enumerate()
        .map(|(i, (bar, ema))| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: i + 1 >= period,
            value: IndicatorValue::Simple(ema),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Exponential smoothing with weight `alpha`, seeded at the first value.
pub(crate) fn smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}
