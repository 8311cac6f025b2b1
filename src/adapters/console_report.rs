//! Plain-text dashboard and performance summary.
//!
//! Renderers take any `io::Write` so the CLI can print to stdout and tests
//! can render into a buffer.

use crate::domain::ledger::Ledger;
use crate::domain::metrics::{sorted_by_exit, PerformanceReport};
use crate::domain::position::{ClosedTrade, Direction};
use std::io::{self, Write};

/// Signals shown at the bottom of the dashboard.
pub const DASHBOARD_SIGNALS: usize = 20;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn render_performance<W: Write>(out: &mut W, report: &PerformanceReport) -> io::Result<()> {
    writeln!(out, "=== Performance ===")?;
    writeln!(out, "Initial Capital:  {:.2}", report.initial_capital)?;
    writeln!(out, "Final Capital:    {:.2}", report.final_capital)?;
    writeln!(out, "Net P/L:          {:+.2}", report.net_pnl)?;
    writeln!(out, "ROI:              {:+.2}%", report.roi_pct)?;
    writeln!(out, "Gross P/L:        {:+.2}", report.gross_pnl)?;
    writeln!(out, "Fees:             {:.2}", report.total_fees)?;
    writeln!(out, "Total Trades:     {}", report.total_trades)?;
    writeln!(
        out,
        "Winners/Losers:   {} / {}",
        report.winners, report.losers
    )?;
    writeln!(out, "Win Rate:         {:.1}%", report.win_rate_pct)?;
    writeln!(out, "Avg P/L:          {:+.2}", report.avg_pnl)?;
    writeln!(out, "Avg Win:          {:.2}", report.avg_win)?;
    writeln!(out, "Avg Loss:         {:.2}", report.avg_loss)?;
    writeln!(out, "Largest Win:      {:.2}", report.largest_win)?;
    writeln!(out, "Largest Loss:     {:.2}", report.largest_loss)?;
    if report.profit_factor.is_infinite() {
        writeln!(out, "Profit Factor:    inf")?;
    } else {
        writeln!(out, "Profit Factor:    {:.2}", report.profit_factor)?;
    }
    writeln!(out, "Max Drawdown:     -{:.2}%", report.max_drawdown_pct)?;
    writeln!(out, "Avg Holding:      {:.1} days", report.avg_holding_days)?;
    Ok(())
}

/// Per-instrument trade count and net P/L, sorted by instrument.
pub fn render_instrument_summary<W: Write>(out: &mut W, trades: &[ClosedTrade]) -> io::Result<()> {
    let mut by_instrument: std::collections::BTreeMap<&str, (usize, usize, f64)> =
        std::collections::BTreeMap::new();
    for trade in trades {
        let entry = by_instrument.entry(trade.instrument.as_str()).or_default();
        entry.0 += 1;
        if trade.net_pnl > 0.0 {
            entry.1 += 1;
        }
        entry.2 += trade.net_pnl;
    }

    if by_instrument.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n=== Per-Instrument Summary ===")?;
    for (instrument, (count, wins, net)) in by_instrument {
        writeln!(
            out,
            "  {:<14} {:>4} trades  {:>5.1}% win  {:+.2}",
            instrument,
            count,
            wins as f64 * 100.0 / count as f64,
            net
        )?;
    }
    Ok(())
}

fn render_trades<W: Write>(out: &mut W, trades: &[ClosedTrade]) -> io::Result<()> {
    writeln!(
        out,
        "{:<14} {:<5} {:<16} {:>10} {:<16} {:>10} {:>10} {:>12}  {}",
        "INSTRUMENT", "SIDE", "ENTRY TIME", "ENTRY", "EXIT TIME", "EXIT", "QTY", "NET P/L", "REASON"
    )?;
    for trade in sorted_by_exit(trades).into_iter().rev() {
        writeln!(
            out,
            "{:<14} {:<5} {:<16} {:>10.2} {:<16} {:>10.2} {:>10} {:>+12.2}  {}",
            trade.instrument,
            trade.direction.to_string(),
            trade.entry_time.format(TIME_FORMAT),
            trade.entry_price,
            trade.exit_time.format(TIME_FORMAT),
            trade.exit_price,
            trade.quantity,
            trade.net_pnl,
            trade.reason
        )?;
    }
    Ok(())
}

pub fn render_dashboard<W: Write>(out: &mut W, ledger: &Ledger) -> io::Result<()> {
    let longs = ledger
        .open_positions()
        .filter(|p| p.direction == Direction::Long)
        .count();
    let shorts = ledger.open_count() - longs;

    writeln!(out, "=== Portfolio ===")?;
    writeln!(out, "Capital:          {:.2}", ledger.capital())?;
    writeln!(out, "Realized P/L:     {:+.2}", ledger.realized_pnl())?;
    writeln!(out, "Unrealized P/L:   {:+.2}", ledger.unrealized_pnl())?;
    writeln!(out, "Active:           {} long / {} short", longs, shorts)?;

    writeln!(out, "\n=== Open Positions ===")?;
    if ledger.open_count() == 0 {
        writeln!(out, "(none)")?;
    } else {
        writeln!(
            out,
            "{:<14} {:<13} {:<16} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "INSTRUMENT", "STATE", "ENTRY TIME", "ENTRY", "STOP", "LAST", "QTY", "UNREAL P/L"
        )?;
        for pos in ledger.open_positions() {
            writeln!(
                out,
                "{:<14} {:<13} {:<16} {:>10.2} {:>10.2} {:>10.2} {:>10} {:>+12.2}",
                pos.instrument,
                format!("{:?}", pos.state()),
                pos.entry_time.format(TIME_FORMAT),
                pos.entry_price,
                pos.stop,
                pos.last_price,
                pos.quantity,
                pos.unrealized_pnl(pos.last_price)
            )?;
        }
    }

    writeln!(out, "\n=== Closed Trades ===")?;
    if ledger.closed_trades().is_empty() {
        writeln!(out, "(none)")?;
    } else {
        render_trades(out, ledger.closed_trades())?;
    }

    writeln!(out, "\n=== Latest Signals ===")?;
    if ledger.signals().is_empty() {
        writeln!(out, "(none)")?;
    }
    for signal in ledger.signals().iter().take(DASHBOARD_SIGNALS) {
        writeln!(out, "{}", signal)?;
    }
    Ok(())
}
