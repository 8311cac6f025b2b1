//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean of the last n source values.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::{Bar, PriceSource};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_sma(bars: &[Bar], period: usize, source: PriceSource) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma { period, source };
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += source.of(bar);
        if i >= period {
            sum -= source.of(&bars[i - period]);
        }

        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: IndicatorValue::Simple(if valid { sum / period as f64 } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
