//! Market data port trait.

use std::fmt;
use std::str::FromStr;

use crate::domain::bar::Bar;
use crate::domain::error::SwingError;

/// Bar interval requested from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Hour,
    Day,
    Week,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hour => "1h",
            Interval::Day => "1d",
            Interval::Week => "1wk",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1h" | "60m" | "hour" | "hourly" => Ok(Interval::Hour),
            "1d" | "day" | "daily" => Ok(Interval::Day),
            "1wk" | "1w" | "week" | "weekly" => Ok(Interval::Week),
            other => Err(format!("unknown interval '{}' (expected 1h, 1d or 1wk)", other)),
        }
    }
}

pub trait BarSource {
    /// Bars for `instrument` in ascending time order. `lookback` caps the
    /// result to the most recent bars; 0 returns everything available.
    fn fetch(&self, instrument: &str, interval: Interval, lookback: usize)
        -> Result<Vec<Bar>, SwingError>;
}

/// Keeps the last `lookback` bars; 0 keeps all.
pub fn keep_last(mut bars: Vec<Bar>, lookback: usize) -> Vec<Bar> {
    if lookback > 0 && bars.len() > lookback {
        let excess = bars.len() - lookback;
        bars.drain(..excess);
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn interval_parsing() {
        assert_eq!("1h".parse::<Interval>(), Ok(Interval::Hour));
        assert_eq!("Weekly".parse::<Interval>(), Ok(Interval::Week));
        assert_eq!("1d".parse::<Interval>().map(|i| i.to_string()), Ok("1d".into()));
        assert!("5m".parse::<Interval>().is_err());
    }

    #[test]
    fn keep_last_trims_oldest() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let kept = keep_last(bars.clone(), 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].close, 3.0);
        assert_eq!(keep_last(bars.clone(), 0).len(), 4);
        assert_eq!(keep_last(bars, 10).len(), 4);
    }
}
