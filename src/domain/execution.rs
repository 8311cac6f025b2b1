//! Position sizing, fees and application of decisions to the ledger.
//!
//! Sizing follows fixed-fractional risk: a constant share of capital is put
//! at risk per trade and the quantity is whatever makes the distance to the
//! stop cost exactly that much.

use tracing::info;

use crate::domain::bar::Bar;
use crate::domain::error::SwingError;
use crate::domain::ledger::{Ledger, LedgerError};
use crate::domain::position::{ClosedTrade, Direction, ExitReason, Position};
use crate::domain::signal::Decision;

/// Account-level risk parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    pub capital: f64,
    pub risk_fraction: f64,
    pub brokerage_rate: f64,
    /// Allow non-integer quantities (crypto).
    pub fractional_qty: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            capital: 2_000_000.0,
            risk_fraction: 0.005,
            brokerage_rate: 0.0015,
            fractional_qty: false,
        }
    }
}

impl RiskConfig {
    pub fn risk_amount(&self) -> f64 {
        self.capital * self.risk_fraction
    }
}

/// Distance from entry to stop in the losing direction; must be positive.
pub fn risk_per_unit(direction: Direction, entry: f64, stop: f64) -> Result<f64, SwingError> {
    let risk = (entry - stop) * direction.sign();
    if risk.is_finite() && risk > 0.0 {
        Ok(risk)
    } else {
        Err(SwingError::InvalidRisk { entry, stop })
    }
}

/// `floor(capital * risk_fraction / risk_per_unit)`, or the unrounded value
/// for fractional instruments.
pub fn position_size(
    config: &RiskConfig,
    direction: Direction,
    entry: f64,
    stop: f64,
) -> Result<f64, SwingError> {
    let risk_per_unit = risk_per_unit(direction, entry, stop)?;
    let risk_amount = config.risk_amount();
    let raw = risk_amount / risk_per_unit;
    let quantity = if config.fractional_qty { raw } else { raw.floor() };

    if quantity.is_finite() && quantity > 0.0 {
        Ok(quantity)
    } else {
        Err(SwingError::ZeroQuantity {
            risk_amount,
            risk_per_unit,
        })
    }
}

pub fn fee(notional: f64, brokerage_rate: f64) -> f64 {
    notional.abs() * brokerage_rate
}

pub fn round_trip_fees(entry_notional: f64, exit_notional: f64, brokerage_rate: f64) -> f64 {
    fee(entry_notional, brokerage_rate) + fee(exit_notional, brokerage_rate)
}

/// Gross P/L; a short profits when the exit is below the entry.
pub fn gross_pnl(direction: Direction, entry: f64, exit: f64, quantity: f64) -> f64 {
    (exit - entry) * quantity * direction.sign()
}

/// What applying a decision did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Nothing,
    Opened(Position),
    Closed(ClosedTrade),
    PartiallyClosed(ClosedTrade),
    StopTrailed {
        instrument: String,
        direction: Direction,
        from: f64,
        to: f64,
    },
}

impl TradeEvent {
    /// Human-readable event line for the signal feed and notifications.
    pub fn message(&self) -> Option<String> {
        match self {
            TradeEvent::Nothing => None,
            TradeEvent::Opened(p) => Some(format!(
                "{} ENTRY: {} @ {:.3} | SL {:.3} | Qty {}",
                p.direction,
                p.instrument,
                p.entry_price,
                p.stop,
                format_quantity(p.quantity)
            )),
            TradeEvent::Closed(t) => Some(format!(
                "{} EXIT: {} @ {:.3} | {} | P/L {:.2}",
                t.direction, t.instrument, t.exit_price, t.reason, t.net_pnl
            )),
            TradeEvent::PartiallyClosed(t) => Some(format!(
                "{} PARTIAL: {} {} @ {:.3} | P/L {:.2} | SL {:.3}",
                t.direction,
                t.instrument,
                format_quantity(t.quantity),
                t.exit_price,
                t.net_pnl,
                t.final_stop
            )),
            TradeEvent::StopTrailed {
                instrument,
                direction,
                from,
                to,
            } => Some(format!(
                "{direction} TRAIL: {instrument} SL {from:.3} -> {to:.3}"
            )),
        }
    }
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity:.6}")
    }
}

/// Applies `decision` for `instrument` on `bar`. The ledger is untouched
/// when an error is returned.
pub fn apply_decision(
    ledger: &mut Ledger,
    instrument: &str,
    decision: &Decision,
    bar: &Bar,
) -> Result<TradeEvent, LedgerError> {
    let event = match *decision {
        Decision::None => TradeEvent::Nothing,
        Decision::EnterLong {
            price,
            stop,
            quantity,
        } => open(ledger, instrument, Direction::Long, price, stop, quantity, bar)?,
        Decision::EnterShort {
            price,
            stop,
            quantity,
        } => open(ledger, instrument, Direction::Short, price, stop, quantity, bar)?,
        Decision::Exit { price, reason } => {
            // a breach is measured against the stop trailed on this bar
            if reason == ExitReason::StopLoss
                && ledger
                    .position(instrument)
                    .is_some_and(|p| !p.would_loosen(price))
            {
                ledger.update_stop(instrument, price)?;
            }
            let trade = ledger.close(instrument, price, bar.timestamp, reason)?;
            info!(
                instrument,
                direction = %trade.direction,
                exit = trade.exit_price,
                net_pnl = trade.net_pnl,
                reason = %trade.reason,
                "position closed"
            );
            TradeEvent::Closed(trade)
        }
        Decision::PartialExit {
            quantity,
            price,
            new_stop,
        } => {
            let trade =
                ledger.partial_close(instrument, quantity, price, bar.timestamp, new_stop)?;
            info!(
                instrument,
                quantity,
                price,
                new_stop,
                net_pnl = trade.net_pnl,
                "partial profit taken"
            );
            TradeEvent::PartiallyClosed(trade)
        }
        Decision::Trail { new_stop } => {
            let (from, direction) = ledger
                .position(instrument)
                .map(|p| (p.stop, p.direction))
                .ok_or_else(|| LedgerError::NoOpenPosition {
                    instrument: instrument.to_string(),
                })?;
            if ledger.update_stop(instrument, new_stop)? {
                info!(instrument, from, to = new_stop, "stop trailed");
                TradeEvent::StopTrailed {
                    instrument: instrument.to_string(),
                    direction,
                    from,
                    to: new_stop,
                }
            } else {
                TradeEvent::Nothing
            }
        }
    };

    ledger.mark_price(instrument, bar.close);
    Ok(event)
}

fn open(
    ledger: &mut Ledger,
    instrument: &str,
    direction: Direction,
    price: f64,
    stop: f64,
    quantity: f64,
    bar: &Bar,
) -> Result<TradeEvent, LedgerError> {
    let position = Position::open(instrument, direction, price, stop, quantity, bar.timestamp);
    ledger.open(position.clone())?;
    info!(
        instrument,
        direction = %direction,
        entry = price,
        stop,
        quantity,
        "position opened"
    );
    Ok(TradeEvent::Opened(position))
}
