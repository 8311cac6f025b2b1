//! Average True Range.
//!
//! TR[0] = high - low, TR[i] = true range against the previous close,
//! smoothed with alpha = 1/n from the first bar.

use crate::domain::bar::Bar;
use crate::domain::indicator::ema::smooth;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// Raw smoothed ATR values for every bar, including the warmup window.
pub(crate) fn atr_values(bars: &[Bar], period: usize) -> Vec<f64> {
    smooth(&true_ranges(bars), 1.0 / period as f64)
}

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let values = bars
        .iter()
        .zip(atr_values(bars, period))
        .enumerate()
        .map(|(i, (bar, atr))| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: i + 1 >= period,
            value: IndicatorValue::Simple(atr),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
