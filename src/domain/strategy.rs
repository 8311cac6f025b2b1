//! Strategy definitions: entry/exit rule sets and trailing parameters.
//!
//! Two rule families are supported and selected by configuration:
//! an aligned moving-average crossover (intraday) and a Supertrend
//! pullback breakout (weekly, long only).

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::{IndicatorParseError, IndicatorType};
use crate::domain::bar::PriceSource;

/// A level the close must clear for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakoutRef {
    /// Previous bar's high for longs, previous bar's low for shorts.
    PreviousBar,
    Indicator(IndicatorType),
}

impl FromStr for BreakoutRef {
    type Err = IndicatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prev_bar" | "prev_high" => Ok(BreakoutRef::PreviousBar),
            _ => s.parse().map(BreakoutRef::Indicator),
        }
    }
}

impl fmt::Display for BreakoutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakoutRef::PreviousBar => write!(f, "previous bar"),
            BreakoutRef::Indicator(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossover {
    /// Averages ordered fast to slow; each must be strictly above the next
    /// for longs and strictly below for shorts.
    pub trend: Vec<IndicatorType>,
    pub trigger_fast: IndicatorType,
    pub trigger_slow: IndicatorType,
    pub exit_fast: IndicatorType,
    pub exit_slow: IndicatorType,
    /// Initial stop = trigger_slow * (1 - buffer) for longs, (1 + buffer) for shorts.
    pub stop_buffer: f64,
    pub breakouts: Vec<BreakoutRef>,
    pub allow_shorting: bool,
}

impl Default for MaCrossover {
    fn default() -> Self {
        MaCrossover {
            trend: vec![
                IndicatorType::ema(21),
                IndicatorType::ema(50),
                IndicatorType::sma(100),
                IndicatorType::sma(200),
            ],
            trigger_fast: IndicatorType::ema(10),
            trigger_slow: IndicatorType::ema(21),
            exit_fast: IndicatorType::ema(5),
            exit_slow: IndicatorType::ema(10),
            stop_buffer: 0.001,
            breakouts: Vec::new(),
            allow_shorting: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendBreakout {
    pub supertrend: IndicatorType,
    /// Maximum distance of the close above the Supertrend line, as a fraction.
    pub max_extension: f64,
    pub breakouts: Vec<BreakoutRef>,
}

impl Default for SupertrendBreakout {
    fn default() -> Self {
        SupertrendBreakout {
            supertrend: IndicatorType::supertrend(10, 3.0),
            max_extension: 0.05,
            breakouts: vec![
                BreakoutRef::PreviousBar,
                BreakoutRef::Indicator(IndicatorType::Sma {
                    period: 50,
                    source: PriceSource::High,
                }),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    MaCrossover(MaCrossover),
    Supertrend(SupertrendBreakout),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::MaCrossover(_) => "ma_crossover",
            Strategy::Supertrend(_) => "supertrend",
        }
    }

    pub fn allows_shorting(&self) -> bool {
        match self {
            Strategy::MaCrossover(s) => s.allow_shorting,
            Strategy::Supertrend(_) => false,
        }
    }

    /// Every indicator the rules read, without duplicates.
    pub fn indicators(&self) -> Vec<IndicatorType> {
        let mut out: Vec<IndicatorType> = Vec::new();
        let mut push = |i: IndicatorType| {
            if !out.contains(&i) {
                out.push(i);
            }
        };

        let breakouts = match self {
            Strategy::MaCrossover(s) => {
                s.trend.iter().copied().for_each(&mut push);
                push(s.trigger_fast);
                push(s.trigger_slow);
                push(s.exit_fast);
                push(s.exit_slow);
                &s.breakouts
            }
            Strategy::Supertrend(s) => {
                push(s.supertrend);
                &s.breakouts
            }
        };
        for b in breakouts {
            if let BreakoutRef::Indicator(i) = b {
                push(*i);
            }
        }
        out
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::MaCrossover(MaCrossover::default())
    }
}

/// Trailing-stop and partial-profit parameters, all in R multiples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingConfig {
    pub enabled: bool,
    pub breakeven_r: f64,
    pub lock_r: f64,
    /// Where the stop goes once `lock_r` is reached, in R from entry.
    pub lock_level_r: f64,
    pub partial_r: Option<f64>,
    pub partial_fraction: f64,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        TrailingConfig {
            enabled: true,
            breakeven_r: 1.0,
            lock_r: 2.0,
            lock_level_r: 1.0,
            partial_r: None,
            partial_fraction: 0.5,
        }
    }
}
