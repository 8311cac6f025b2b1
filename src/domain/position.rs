//! Position tracking and closed-trade records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// The price extreme that moves in the position's favour.
    pub fn favourable_extreme(self, bar: &Bar) -> f64 {
        match self {
            Direction::Long => bar.high,
            Direction::Short => bar.low,
        }
    }

    /// True when the bar trades through `stop` (low for longs, high for
    /// shorts). Touching the stop counts.
    pub fn stop_breached(self, bar: &Bar, stop: f64) -> bool {
        match self {
            Direction::Long => bar.low <= stop,
            Direction::Short => bar.high >= stop,
        }
    }

    /// The tighter of two stops for this direction.
    pub fn tighter_stop(self, a: f64, b: f64) -> f64 {
        match self {
            Direction::Long => a.max(b),
            Direction::Short => a.min(b),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    /// A first profit target was taken; quantity reduced, stop at breakeven or better.
    Partial,
}

/// Per-instrument state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
    LongPartial,
    Short,
    ShortPartial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    SignalExit,
    TrendFlip,
    PartialTarget,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "Stop Loss Hit",
            ExitReason::SignalExit => "Exit Cross",
            ExitReason::TrendFlip => "Supertrend Flip",
            ExitReason::PartialTarget => "Partial Target",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub quantity: f64,
    pub initial_quantity: f64,
    pub initial_stop: f64,
    /// |entry - initial stop|, fixed at entry.
    pub risk_per_unit: f64,
    pub stop: f64,
    pub status: PositionStatus,
    pub last_price: f64,
}

impl Position {
    /// Builds an open position. Risk per unit is derived once here.
    pub fn open(
        instrument: &str,
        direction: Direction,
        entry_price: f64,
        stop: f64,
        quantity: f64,
        entry_time: NaiveDateTime,
    ) -> Self {
        Position {
            instrument: instrument.to_string(),
            direction,
            entry_price,
            entry_time,
            quantity,
            initial_quantity: quantity,
            initial_stop: stop,
            risk_per_unit: (entry_price - stop) * direction.sign(),
            stop,
            status: PositionStatus::Open,
            last_price: entry_price,
        }
    }

    pub fn state(&self) -> PositionState {
        match (self.direction, self.status) {
            (Direction::Long, PositionStatus::Open) => PositionState::Long,
            (Direction::Long, PositionStatus::Partial) => PositionState::LongPartial,
            (Direction::Short, PositionStatus::Open) => PositionState::Short,
            (Direction::Short, PositionStatus::Partial) => PositionState::ShortPartial,
        }
    }

    pub fn notional(&self) -> f64 {
        self.quantity * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price) * self.direction.sign()
    }

    /// Reward measured in multiples of the initial risk per unit.
    pub fn r_multiple(&self, price: f64) -> f64 {
        if self.risk_per_unit <= 0.0 {
            return 0.0;
        }
        (price - self.entry_price) * self.direction.sign() / self.risk_per_unit
    }

    /// Price `r` multiples of risk away from entry in the favourable direction.
    pub fn price_at_r(&self, r: f64) -> f64 {
        self.entry_price + self.direction.sign() * r * self.risk_per_unit
    }

    /// True when `candidate` would move the stop against the position.
    pub fn would_loosen(&self, candidate: f64) -> bool {
        match self.direction {
            Direction::Long => candidate < self.stop,
            Direction::Short => candidate > self.stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub quantity: f64,
    pub initial_stop: f64,
    pub final_stop: f64,
    pub gross_pnl: f64,
    pub fees: f64,
    pub net_pnl: f64,
    pub reason: ExitReason,
}

impl ClosedTrade {
    pub fn entry_notional(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Net return on the entry notional, in percent.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_notional();
        if notional == 0.0 {
            0.0
        } else {
            self.net_pnl / notional * 100.0
        }
    }
}
