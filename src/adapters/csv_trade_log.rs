//! Closed-trade CSV log with running P/L and equity columns.

use crate::domain::error::SwingError;
use crate::domain::metrics::{sorted_by_exit, PerformanceReport};
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::path::Path;
use tracing::info;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTradeLog;

#[derive(Serialize)]
struct TradeRow<'a> {
    instrument: &'a str,
    direction: String,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    quantity: f64,
    initial_stop: f64,
    final_stop: f64,
    gross_pnl: f64,
    fees: f64,
    net_pnl: f64,
    return_pct: f64,
    reason: String,
    cumulative_pnl: f64,
    equity: f64,
}

fn report_error(e: impl ToString) -> SwingError {
    SwingError::Report {
        reason: e.to_string(),
    }
}

impl ReportPort for CsvTradeLog {
    fn write(
        &self,
        trades: &[ClosedTrade],
        report: &PerformanceReport,
        output_path: &Path,
    ) -> Result<(), SwingError> {
        let mut writer = csv::Writer::from_path(output_path).map_err(report_error)?;

        let mut cumulative = 0.0;
        for trade in sorted_by_exit(trades) {
            cumulative += trade.net_pnl;
            writer
                .serialize(TradeRow {
                    instrument: &trade.instrument,
                    direction: trade.direction.to_string(),
                    entry_time: trade.entry_time.format(TIME_FORMAT).to_string(),
                    entry_price: trade.entry_price,
                    exit_time: trade.exit_time.format(TIME_FORMAT).to_string(),
                    exit_price: trade.exit_price,
                    quantity: trade.quantity,
                    initial_stop: trade.initial_stop,
                    final_stop: trade.final_stop,
                    gross_pnl: trade.gross_pnl,
                    fees: trade.fees,
                    net_pnl: trade.net_pnl,
                    return_pct: trade.return_pct(),
                    reason: trade.reason.to_string(),
                    cumulative_pnl: cumulative,
                    equity: report.initial_capital + cumulative,
                })
                .map_err(report_error)?;
        }

        writer.flush().map_err(report_error)?;
        info!(path = %output_path.display(), trades = trades.len(), "trade log written");
        Ok(())
    }
}
