//! Supertrend indicator.
//!
//! basic_upper = hl2 + m*ATR, basic_lower = hl2 - m*ATR.
//! From bar `period` on, each final band carries forward the previous final
//! band unless the new basic band is tighter or the previous close broke
//! through it. The trend starts up at bar `period` and flips on the first
//! close beyond the opposite final band. The published value is the final
//! lower band in an uptrend and the final upper band in a downtrend.
//!
//! Each bar depends on the previous bar's bands and trend, so the scan is
//! strictly sequential.
//! Warmup: first `period` bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::atr::atr_values;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Trend,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub lower: f64,
}

/// Final upper/lower bands for every bar.
pub fn final_bands(bars: &[Bar], period: usize, multiplier: f64) -> Vec<Bands> {
    let atr = atr_values(bars, period);
    let mut out: Vec<Bands> = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let mid = bar.hl2();
        let basic = Bands {
            upper: mid + multiplier * atr[i],
            lower: mid - multiplier * atr[i],
        };

        if i < period {
            out.push(basic);
            continue;
        }

        let prev = out[i - 1];
        let prev_close = bars[i - 1].close;

        let upper = if basic.upper < prev.upper || prev_close > prev.upper {
            basic.upper
        } else {
            prev.upper
        };
        let lower = if basic.lower > prev.lower || prev_close < prev.lower {
            basic.lower
        } else {
            prev.lower
        };
        out.push(Bands { upper, lower });
    }

    out
}

pub fn calculate_supertrend(bars: &[Bar], period: usize, multiplier: f64) -> IndicatorSeries {
    let indicator_type = IndicatorType::supertrend(period, multiplier);
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }

    let bands = final_bands(bars, period, multiplier);
    let mut values = Vec::with_capacity(bars.len());
    let mut trend = Trend::Up;

    for (i, bar) in bars.iter().enumerate() {
        if i < period {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Supertrend {
                    value: 0.0,
                    trend,
                },
            });
            continue;
        }

        let band = bands[i];
        trend = match trend {
            Trend::Up if bar.close < band.lower => Trend::Down,
            Trend::Down if bar.close > band.upper => Trend::Up,
            unchanged => unchanged,
        };
        let value = match trend {
            Trend::Up => band.lower,
            Trend::Down => band.upper,
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Supertrend { value, trend },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
