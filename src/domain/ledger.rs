//! Position ledger: open positions keyed by instrument, append-only trade
//! history, cash and the event feed.
//!
//! Every mutation validates first and only then mutates, so a rejected call
//! leaves the ledger exactly as it was.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::execution::{fee, gross_pnl, round_trip_fees};
use crate::domain::position::{ClosedTrade, ExitReason, Position, PositionState, PositionStatus};

/// Newest-first event messages kept in the ledger document.
pub const MAX_SIGNALS: usize = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("position already open for {instrument}")]
    PositionExists { instrument: String },

    #[error("no open position for {instrument}")]
    NoOpenPosition { instrument: String },

    #[error("stop for {instrument} would loosen from {current} to {proposed}")]
    LooseningStop {
        instrument: String,
        current: f64,
        proposed: f64,
    },

    #[error("insufficient cash for {instrument}: need {required:.2}, have {available:.2}")]
    InsufficientCash {
        instrument: String,
        required: f64,
        available: f64,
    },

    #[error("invalid quantity {quantity} for {instrument}")]
    InvalidQuantity { instrument: String, quantity: f64 },

    #[error("invalid position for {instrument}: {reason}")]
    InvalidPosition { instrument: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerConfig {
    pub brokerage_rate: f64,
    /// Reject entries whose cost exceeds available cash.
    pub enforce_cash: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            brokerage_rate: 0.0015,
            enforce_cash: true,
        }
    }
}

/// The persisted ledger document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub capital: f64,
    #[serde(default)]
    pub open: BTreeMap<String, Position>,
    #[serde(default)]
    pub closed: Vec<ClosedTrade>,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub last_evaluated: BTreeMap<String, NaiveDateTime>,
}

impl LedgerState {
    pub fn new(capital: f64) -> Self {
        LedgerState {
            capital,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    state: LedgerState,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(capital: f64, config: LedgerConfig) -> Self {
        Self::restore(LedgerState::new(capital), config)
    }

    pub fn restore(state: LedgerState, config: LedgerConfig) -> Self {
        Ledger { state, config }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn capital(&self) -> f64 {
        self.state.capital
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.state.open.get(instrument)
    }

    pub fn has_position(&self, instrument: &str) -> bool {
        self.state.open.contains_key(instrument)
    }

    pub fn state_of(&self, instrument: &str) -> PositionState {
        self.position(instrument)
            .map(Position::state)
            .unwrap_or(PositionState::Flat)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.state.open.values()
    }

    pub fn open_count(&self) -> usize {
        self.state.open.len()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.state.closed
    }

    /// Opens `position`, debiting its notional plus the entry fee.
    pub fn open(&mut self, position: Position) -> Result<(), LedgerError> {
        let instrument = position.instrument.clone();
        if self.has_position(&instrument) {
            return Err(LedgerError::PositionExists { instrument });
        }
        if !(position.quantity.is_finite() && position.quantity > 0.0) {
            return Err(LedgerError::InvalidQuantity {
                instrument,
                quantity: position.quantity,
            });
        }
        if !(position.risk_per_unit > 0.0) {
            return Err(LedgerError::InvalidPosition {
                instrument,
                reason: "risk per unit must be positive".into(),
            });
        }

        let notional = position.notional();
        let cost = notional + fee(notional, self.config.brokerage_rate);
        if self.config.enforce_cash && cost > self.state.capital {
            return Err(LedgerError::InsufficientCash {
                instrument,
                required: cost,
                available: self.state.capital,
            });
        }

        self.state.capital -= cost;
        self.state.open.insert(instrument, position);
        Ok(())
    }

    /// Closes the whole open position and moves it to history.
    pub fn close(
        &mut self,
        instrument: &str,
        exit_price: f64,
        exit_time: NaiveDateTime,
        reason: ExitReason,
    ) -> Result<ClosedTrade, LedgerError> {
        let position = self
            .state
            .open
            .remove(instrument)
            .ok_or_else(|| LedgerError::NoOpenPosition {
                instrument: instrument.to_string(),
            })?;

        let trade = self.settle(&position, position.quantity, exit_price, exit_time, reason);
        Ok(trade)
    }

    /// Closes `quantity` of the position at a first profit target and
    /// ratchets the stop of the remainder.
    pub fn partial_close(
        &mut self,
        instrument: &str,
        quantity: f64,
        exit_price: f64,
        exit_time: NaiveDateTime,
        new_stop: f64,
    ) -> Result<ClosedTrade, LedgerError> {
        let position = self.position(instrument).ok_or_else(|| LedgerError::NoOpenPosition {
            instrument: instrument.to_string(),
        })?;

        if !(quantity > 0.0 && quantity < position.quantity) {
            return Err(LedgerError::InvalidQuantity {
                instrument: instrument.to_string(),
                quantity,
            });
        }
        if position.would_loosen(new_stop) {
            return Err(LedgerError::LooseningStop {
                instrument: instrument.to_string(),
                current: position.stop,
                proposed: new_stop,
            });
        }

        let snapshot = position.clone();
        let trade = self.settle(
            &snapshot,
            quantity,
            exit_price,
            exit_time,
            ExitReason::PartialTarget,
        );

        if let Some(pos) = self.state.open.get_mut(instrument) {
            pos.quantity -= quantity;
            pos.status = PositionStatus::Partial;
            pos.stop = new_stop;
            pos.last_price = exit_price;
        }
        Ok(trade)
    }

    /// Moves the stop. Returns whether it changed; loosening is an error.
    pub fn update_stop(&mut self, instrument: &str, new_stop: f64) -> Result<bool, LedgerError> {
        let position =
            self.state
                .open
                .get_mut(instrument)
                .ok_or_else(|| LedgerError::NoOpenPosition {
                    instrument: instrument.to_string(),
                })?;

        if position.would_loosen(new_stop) {
            return Err(LedgerError::LooseningStop {
                instrument: instrument.to_string(),
                current: position.stop,
                proposed: new_stop,
            });
        }
        let changed = position.stop != new_stop;
        position.stop = new_stop;
        Ok(changed)
    }

    /// Records the latest price for unrealized P/L reporting.
    pub fn mark_price(&mut self, instrument: &str, price: f64) -> bool {
        match self.state.open.get_mut(instrument) {
            Some(pos) => {
                pos.last_price = price;
                true
            }
            None => false,
        }
    }

    pub fn realized_pnl(&self) -> f64 {
        self.state.closed.iter().map(|t| t.net_pnl).sum()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.state
            .open
            .values()
            .map(|p| p.unrealized_pnl(p.last_price))
            .sum()
    }

    pub fn record_signal(&mut self, message: String) {
        self.state.signals.insert(0, message);
        self.state.signals.truncate(MAX_SIGNALS);
    }

    pub fn signals(&self) -> &[String] {
        &self.state.signals
    }

    pub fn last_evaluated(&self, instrument: &str) -> Option<NaiveDateTime> {
        self.state.last_evaluated.get(instrument).copied()
    }

    pub fn mark_evaluated(&mut self, instrument: &str, timestamp: NaiveDateTime) {
        self.state
            .last_evaluated
            .insert(instrument.to_string(), timestamp);
    }

    fn settle(
        &mut self,
        position: &Position,
        quantity: f64,
        exit_price: f64,
        exit_time: NaiveDateTime,
        reason: ExitReason,
    ) -> ClosedTrade {
        let rate = self.config.brokerage_rate;
        let entry_notional = position.entry_price * quantity;
        let exit_notional = exit_price * quantity;
        let gross = gross_pnl(position.direction, position.entry_price, exit_price, quantity);
        let fees = round_trip_fees(entry_notional, exit_notional, rate);

        // Entry fee was paid at open; the escrowed notional comes back with the price move.
        self.state.capital += entry_notional + gross - fee(exit_notional, rate);

        let trade = ClosedTrade {
            instrument: position.instrument.clone(),
            direction: position.direction,
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            exit_price,
            exit_time,
            quantity,
            initial_stop: position.initial_stop,
            final_stop: position.stop,
            gross_pnl: gross,
            fees,
            net_pnl: gross - fees,
            reason,
        };
        self.state.closed.push(trade.clone());
        trade
    }
}
