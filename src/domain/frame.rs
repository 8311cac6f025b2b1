//! Per-bar view of a bar plus its derived indicator values.

use std::collections::HashMap;

use crate::domain::bar::{is_strictly_ordered, Bar};
use crate::domain::error::SwingError;
use crate::domain::indicator::{
    compute_indicators, required_warmup, IndicatorType, IndicatorValue, Trend,
};

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub bar: Bar,
    /// Only defined values are present; a missing key means "still warming up".
    pub values: HashMap<IndicatorType, IndicatorValue>,
}

impl IndicatorFrame {
    pub fn new(bar: Bar) -> Self {
        Self {
            bar,
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, indicator: IndicatorType, value: IndicatorValue) -> Self {
        self.values.insert(indicator, value);
        self
    }

    pub fn value(&self, indicator: &IndicatorType) -> Option<f64> {
        self.values.get(indicator).map(IndicatorValue::scalar)
    }

    pub fn supertrend(&self, indicator: &IndicatorType) -> Option<(f64, Trend)> {
        match self.values.get(indicator) {
            Some(IndicatorValue::Supertrend { value, trend }) => Some((*value, *trend)),
            _ => None,
        }
    }

    pub fn is_defined(&self, indicators: &[IndicatorType]) -> bool {
        indicators.iter().all(|i| self.values.contains_key(i))
    }
}

/// One frame per bar, same length and order as `bars`.
pub fn build_frames(bars: &[Bar], indicators: &[IndicatorType]) -> Vec<IndicatorFrame> {
    let series = compute_indicators(bars, indicators);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let values = series
                .iter()
                .filter_map(|(ty, s)| s.get(i).map(|v| (*ty, v)))
                .collect();
            IndicatorFrame {
                bar: bar.clone(),
                values,
            }
        })
        .collect()
}

/// Minimum bars needed for a defined current and previous frame.
pub fn minimum_bars(indicators: &[IndicatorType]) -> usize {
    required_warmup(indicators) + 2
}

/// Sources are expected to hand over sorted, de-duplicated bars; anything
/// else is rejected as bad data rather than evaluated.
pub fn ensure_ordered(instrument: &str, bars: &[Bar]) -> Result<(), SwingError> {
    if is_strictly_ordered(bars) {
        Ok(())
    } else {
        Err(SwingError::Fetch {
            instrument: instrument.to_string(),
            reason: "bars are not in strictly increasing time order".to_string(),
        })
    }
}

/// Builds frames and returns the last two (previous, current), or
/// `InsufficientData` when the history is too short for every indicator.
pub fn latest_pair(
    instrument: &str,
    bars: &[Bar],
    indicators: &[IndicatorType],
) -> Result<(IndicatorFrame, IndicatorFrame), SwingError> {
    ensure_ordered(instrument, bars)?;
    let minimum = minimum_bars(indicators);
    if bars.len() < minimum {
        return Err(SwingError::InsufficientData {
            instrument: instrument.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    let mut frames = build_frames(bars, indicators);
    let current = frames.pop();
    let previous = frames.pop();
    match (previous, current) {
        (Some(p), Some(c)) if p.is_defined(indicators) && c.is_defined(indicators) => Ok((p, c)),
        _ => Err(SwingError::InsufficientData {
            instrument: instrument.to_string(),
            bars: bars.len(),
            minimum,
        }),
    }
}
