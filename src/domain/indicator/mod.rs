//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every series has the same length as its input bars. Points before an
//! indicator's lookback is satisfied carry `valid = false`.

pub mod atr;
pub mod ema;
pub mod sma;
pub mod supertrend;

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::bar::{Bar, PriceSource};

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Supertrend { value: f64, trend: Trend },
}

impl IndicatorValue {
    /// The published scalar: the value itself, or the active Supertrend band.
    pub fn scalar(&self) -> f64 {
        match self {
            IndicatorValue::Simple(v) => *v,
            IndicatorValue::Supertrend { value, .. } => *value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma { period: usize, source: PriceSource },
    Ema { period: usize, source: PriceSource },
    Atr(usize),
    Supertrend { period: usize, multiplier_x100: u32 },
}

impl IndicatorType {
    pub fn sma(period: usize) -> Self {
        IndicatorType::Sma {
            period,
            source: PriceSource::Close,
        }
    }

    pub fn ema(period: usize) -> Self {
        IndicatorType::Ema {
            period,
            source: PriceSource::Close,
        }
    }

    pub fn supertrend(period: usize, multiplier: f64) -> Self {
        IndicatorType::Supertrend {
            period,
            multiplier_x100: (multiplier * 100.0).round() as u32,
        }
    }

    /// Index of the first bar with a defined value.
    pub fn first_valid_index(&self) -> usize {
        match self {
            IndicatorType::Sma { period, .. }
            | IndicatorType::Ema { period, .. }
            | IndicatorType::Atr(period) => period.saturating_sub(1),
            IndicatorType::Supertrend { period, .. } => *period,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma { period, source } => write_ma(f, "SMA", *period, *source),
            IndicatorType::Ema { period, source } => write_ma(f, "EMA", *period, *source),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Supertrend {
                period,
                multiplier_x100,
            } => {
                let mult = *multiplier_x100 as f64 / 100.0;
                write!(f, "SUPERTREND({},{})", period, mult)
            }
        }
    }
}

fn write_ma(f: &mut fmt::Formatter<'_>, name: &str, period: usize, source: PriceSource) -> fmt::Result {
    match source {
        PriceSource::Close => write!(f, "{}({})", name, period),
        PriceSource::High => write!(f, "{}({},high)", name, period),
        PriceSource::Low => write!(f, "{}({},low)", name, period),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid indicator '{token}': {reason}")]
pub struct IndicatorParseError {
    pub token: String,
    pub reason: String,
}

/// Parses config tokens such as `ema:21`, `sma_high:50`, `atr:14` and
/// `supertrend:10:3`.
impl FromStr for IndicatorType {
    type Err = IndicatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        let err = |reason: &str| IndicatorParseError {
            token: s.trim().to_string(),
            reason: reason.to_string(),
        };

        let mut parts = token.split(':');
        let name = parts.next().unwrap_or_default();
        let period: usize = parts
            .next()
            .ok_or_else(|| err("missing period"))?
            .parse()
            .map_err(|_| err("period is not a whole number"))?;
        if period == 0 {
            return Err(err("period must be at least 1"));
        }

        let parsed = match name {
            "sma" => IndicatorType::sma(period),
            "sma_high" => IndicatorType::Sma {
                period,
                source: PriceSource::High,
            },
            "sma_low" => IndicatorType::Sma {
                period,
                source: PriceSource::Low,
            },
            "ema" => IndicatorType::ema(period),
            "ema_high" => IndicatorType::Ema {
                period,
                source: PriceSource::High,
            },
            "ema_low" => IndicatorType::Ema {
                period,
                source: PriceSource::Low,
            },
            "atr" => IndicatorType::Atr(period),
            "supertrend" => {
                let multiplier: f64 = parts
                    .next()
                    .ok_or_else(|| err("missing multiplier"))?
                    .parse()
                    .map_err(|_| err("multiplier is not a number"))?;
                if multiplier <= 0.0 {
                    return Err(err("multiplier must be positive"));
                }
                IndicatorType::supertrend(period, multiplier)
            }
            _ => return Err(err("unknown indicator")),
        };

        if parts.next().is_some() {
            return Err(err("too many fields"));
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(indicator_type: IndicatorType) -> Self {
        IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// Value at `index`, `None` while warming up or out of range.
    pub fn get(&self, index: usize) -> Option<IndicatorValue> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }
}

pub fn calculate(bars: &[Bar], indicator: IndicatorType) -> IndicatorSeries {
    match indicator {
        IndicatorType::Sma { period, source } => sma::calculate_sma(bars, period, source),
        IndicatorType::Ema { period, source } => ema::calculate_ema(bars, period, source),
        IndicatorType::Atr(period) => atr::calculate_atr(bars, period),
        IndicatorType::Supertrend {
            period,
            multiplier_x100,
        } => supertrend::calculate_supertrend(bars, period, multiplier_x100 as f64 / 100.0),
    }
}

/// Computes every requested indicator once, keyed by type.
pub fn compute_indicators(
    bars: &[Bar],
    indicators: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(indicators.len());
    for indicator in indicators {
        out.entry(*indicator)
            .or_insert_with(|| calculate(bars, *indicator));
    }
    out
}

/// Number of leading bars before every indicator in `indicators` is defined.
pub fn required_warmup(indicators: &[IndicatorType]) -> usize {
    indicators
        .iter()
        .map(|i| i.first_valid_index())
        .max()
        .unwrap_or(0)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorType::ema(21).to_string(), "EMA(21)");
        assert_eq!(
            IndicatorType::Sma {
                period: 50,
                source: PriceSource::High
            }
            .to_string(),
            "SMA(50,high)"
        );
        assert_eq!(IndicatorType::Atr(14).to_string(), "ATR(14)");
        assert_eq!(
            IndicatorType::supertrend(10, 3.0).to_string(),
            "SUPERTREND(10,3)"
        );
    }

    #[test]
    fn parse_tokens() {
        assert_eq!("ema:21".parse::<IndicatorType>(), Ok(IndicatorType::ema(21)));
        assert_eq!(" SMA:200 ".parse::<IndicatorType>(), Ok(IndicatorType::sma(200)));
        assert_eq!(
            "sma_high:50".parse::<IndicatorType>(),
            Ok(IndicatorType::Sma {
                period: 50,
                source: PriceSource::High
            })
        );
        assert_eq!(
            "supertrend:10:2.5".parse::<IndicatorType>(),
            Ok(IndicatorType::Supertrend {
                period: 10,
                multiplier_x100: 250
            })
        );
        assert_eq!("atr:14".parse::<IndicatorType>(), Ok(IndicatorType::Atr(14)));
    }

    #[test]
    fn parse_rejects_bad_tokens() {
        assert!("ema".parse::<IndicatorType>().is_err());
        assert!("ema:0".parse::<IndicatorType>().is_err());
        assert!("ema:x".parse::<IndicatorType>().is_err());
        assert!("wma:10".parse::<IndicatorType>().is_err());
        assert!("supertrend:10".parse::<IndicatorType>().is_err());
        assert!("supertrend:10:-1".parse::<IndicatorType>().is_err());
        assert!("sma:10:3".parse::<IndicatorType>().is_err());
    }

    #[test]
    fn first_valid_index_per_type() {
        assert_eq!(IndicatorType::sma(5).first_valid_index(), 4);
        assert_eq!(IndicatorType::ema(1).first_valid_index(), 0);
        assert_eq!(IndicatorType::Atr(10).first_valid_index(), 9);
        assert_eq!(IndicatorType::supertrend(10, 3.0).first_valid_index(), 10);
    }

    #[test]
    fn required_warmup_is_longest_lookback() {
        let types = [
            IndicatorType::ema(5),
            IndicatorType::sma(200),
            IndicatorType::supertrend(10, 3.0),
        ];
        assert_eq!(required_warmup(&types), 199);
        assert_eq!(required_warmup(&[]), 0);
    }

    #[test]
    fn compute_indicators_deduplicates() {
        let bars = test_support::make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let map = compute_indicators(
            &bars,
            &[IndicatorType::sma(2), IndicatorType::sma(2), IndicatorType::ema(3)],
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map[&IndicatorType::sma(2)].values.len(), 4);
    }

    #[test]
    fn series_get_hides_warmup() {
        let bars = test_support::make_bars(&[1.0, 2.0, 3.0]);
        let series = calculate(&bars, IndicatorType::sma(2));
        assert_eq!(series.get(0), None);
        assert_eq!(series.get(1), Some(IndicatorValue::Simple(1.5)));
        assert_eq!(series.get(5), None);
    }
}
