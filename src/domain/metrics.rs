//! Performance statistics over closed trades.
//!
//! The equity curve is trade-ordered: closed trades sorted by exit time,
//! each adding its net P/L to the initial capital.

use chrono::NaiveDateTime;

use super::position::ClosedTrade;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub cumulative_pnl: f64,
    pub equity: f64,
}

/// Trades sorted by exit time, stable for equal timestamps.
pub fn sorted_by_exit(trades: &[ClosedTrade]) -> Vec<&ClosedTrade> {
    let mut sorted: Vec<&ClosedTrade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.exit_time);
    sorted
}

pub fn equity_curve(trades: &[ClosedTrade], initial_capital: f64) -> Vec<EquityPoint> {
    let mut cumulative = 0.0;
    sorted_by_exit(trades)
        .into_iter()
        .map(|t| {
            cumulative += t.net_pnl;
            EquityPoint {
                time: t.exit_time,
                cumulative_pnl: cumulative,
                equity: initial_capital + cumulative,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate_pct: f64,
    pub gross_pnl: f64,
    pub total_fees: f64,
    pub net_pnl: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub max_drawdown_pct: f64,
    pub roi_pct: f64,
    /// Mean holding time in days.
    pub avg_holding_days: f64,
}

impl PerformanceReport {
    pub fn compute(trades: &[ClosedTrade], initial_capital: f64) -> Self {
        let total_trades = trades.len();

        let mut winners = 0usize;
        let mut losers = 0usize;
        let mut gross_pnl = 0.0_f64;
        let mut total_fees = 0.0_f64;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut holding_seconds = 0i64;

        for trade in trades {
            gross_pnl += trade.gross_pnl;
            total_fees += trade.fees;

            let pnl = trade.net_pnl;
            if pnl > 0.0 {
                winners += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else {
                losers += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
            holding_seconds += (trade.exit_time - trade.entry_time).num_seconds();
        }

        let net_pnl = gross_pnl - total_fees;
        let per_trade = |x: f64, n: usize| if n > 0 { x / n as f64 } else { 0.0 };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let curve = equity_curve(trades, initial_capital);
        let roi_pct = if initial_capital > 0.0 {
            net_pnl / initial_capital * 100.0
        } else {
            0.0
        };

        PerformanceReport {
            initial_capital,
            final_capital: initial_capital + net_pnl,
            total_trades,
            winners,
            losers,
            win_rate_pct: per_trade(winners as f64 * 100.0, total_trades),
            gross_pnl,
            total_fees,
            net_pnl,
            avg_pnl: per_trade(net_pnl, total_trades),
            avg_win: per_trade(total_wins, winners),
            avg_loss: per_trade(total_losses, losers),
            largest_win,
            largest_loss,
            profit_factor,
            max_drawdown_pct: max_drawdown_pct(&curve),
            roi_pct,
            avg_holding_days: per_trade(holding_seconds as f64 / 86_400.0, total_trades),
        }
    }
}

/// Largest peak-to-trough fall of the curve, in percent of the peak.
fn max_drawdown_pct(curve: &[EquityPoint]) -> f64 {
    let Some(first) = curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak * 100.0);
        }
    }
    max_dd
}
