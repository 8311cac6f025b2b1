//! Historical replay of one instrument through the evaluator and a fresh
//! ledger.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::domain::bar::Bar;
use crate::domain::error::SwingError;
use crate::domain::execution::apply_decision;
use crate::domain::frame::{build_frames, ensure_ordered, minimum_bars};
use crate::domain::ledger::{Ledger, LedgerConfig};
use crate::domain::metrics::PerformanceReport;
use crate::domain::position::{ClosedTrade, Position};
use crate::domain::signal::SignalEvaluator;
use crate::ports::bar_source::{BarSource, Interval};

/// Inclusive date filter applied to bars before indicators are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BacktestWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BacktestWindow {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let date = timestamp.date();
        self.start_date.is_none_or(|s| date >= s) && self.end_date.is_none_or(|e| date <= e)
    }

    pub fn filter(&self, bars: &[Bar]) -> Vec<Bar> {
        bars.iter()
            .filter(|b| self.contains(b.timestamp))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub window: BacktestWindow,
    pub ledger: LedgerConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            window: BacktestWindow::default(),
            ledger: LedgerConfig {
                enforce_cash: false,
                ..LedgerConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentBacktest {
    pub instrument: String,
    pub bars: usize,
    pub trades: Vec<ClosedTrade>,
    /// Position still open on the last bar; not counted in the report.
    pub open_at_end: Option<Position>,
}

/// Replays `bars` one decision per bar, starting at the second bar.
pub fn backtest_instrument(
    instrument: &str,
    bars: &[Bar],
    evaluator: &SignalEvaluator,
    config: &BacktestConfig,
) -> Result<InstrumentBacktest, SwingError> {
    let bars = config.window.filter(bars);
    ensure_ordered(instrument, &bars)?;
    let indicators = evaluator.indicators();
    let minimum = minimum_bars(&indicators);
    if bars.len() < minimum {
        return Err(SwingError::InsufficientData {
            instrument: instrument.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    let frames = build_frames(&bars, &indicators);
    let mut ledger = Ledger::new(evaluator.risk().capital, config.ledger);

    for pair in frames.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        let decision = evaluator.evaluate(current, previous, ledger.position(instrument));
        if decision.is_none() {
            continue;
        }
        debug!(instrument, time = %current.bar.timestamp, decision = decision.label(), "backtest decision");
        apply_decision(&mut ledger, instrument, &decision, &current.bar)?;
    }

    let open_at_end = ledger.position(instrument).cloned();
    let state = ledger.into_state();
    Ok(InstrumentBacktest {
        instrument: instrument.to_string(),
        bars: bars.len(),
        trades: state.closed,
        open_at_end,
    })
}

/// Aggregate of every instrument's replay.
#[derive(Debug, Default)]
pub struct BacktestResult {
    pub instruments: Vec<InstrumentBacktest>,
    pub skipped: Vec<(String, SwingError)>,
}

impl BacktestResult {
    pub fn trades(&self) -> Vec<ClosedTrade> {
        self.instruments
            .iter()
            .flat_map(|r| r.trades.iter().cloned())
            .collect()
    }

    pub fn report(&self, initial_capital: f64) -> PerformanceReport {
        PerformanceReport::compute(&self.trades(), initial_capital)
    }
}

/// Fetches full history for each instrument and replays it. Failing
/// instruments are collected in `skipped` instead of aborting the run.
pub fn run_backtest(
    source: &dyn BarSource,
    instruments: &[String],
    interval: Interval,
    evaluator: &SignalEvaluator,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut result = BacktestResult::default();

    for instrument in instruments {
        let replay = source
            .fetch(instrument, interval, 0)
            .and_then(|bars| backtest_instrument(instrument, &bars, evaluator, config));
        match replay {
            Ok(r) => {
                info!(
                    instrument = instrument.as_str(),
                    bars = r.bars,
                    trades = r.trades.len(),
                    "backtest finished"
                );
                result.instruments.push(r);
            }
            Err(e) => {
                warn!(instrument = instrument.as_str(), error = %e, "backtest skipped");
                result.skipped.push((instrument.clone(), e));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::RiskConfig;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::indicator::IndicatorType;
    use crate::domain::position::ExitReason;
    use crate::domain::strategy::{MaCrossover, Strategy, TrailingConfig};

    fn short_crossover() -> SignalEvaluator {
        let strategy = Strategy::MaCrossover(MaCrossover {
            trend: vec![IndicatorType::sma(2), IndicatorType::sma(4)],
            trigger_fast: IndicatorType::sma(1),
            trigger_slow: IndicatorType::sma(2),
            exit_fast: IndicatorType::sma(1),
            exit_slow: IndicatorType::sma(3),
            stop_buffer: 0.05,
            breakouts: Vec::new(),
            allow_shorting: false,
        });
        SignalEvaluator::new(
            strategy,
            RiskConfig {
                capital: 100_000.0,
                risk_fraction: 0.01,
                brokerage_rate: 0.0,
                fractional_qty: false,
            },
            TrailingConfig {
                enabled: false,
                ..Default::default()
            },
        )
    }

    #[test]
    fn window_is_inclusive() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let day = bars[0].timestamp.date();
        let window = BacktestWindow {
            start_date: Some(day),
            end_date: Some(day),
        };
        // hourly fixture bars all fall on the same day
        assert_eq!(window.filter(&bars).len(), 3);

        let later = BacktestWindow {
            start_date: day.succ_opt(),
            end_date: None,
        };
        assert!(later.filter(&bars).is_empty());
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let err = backtest_instrument("ABC", &bars, &short_crossover(), &BacktestConfig::default())
            .unwrap_err();
        assert!(matches!(err, SwingError::InsufficientData { minimum: 5, .. }));
    }

    #[test]
    fn out_of_order_history_is_rejected() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0, 10.0, 9.0, 12.0]);
        bars.swap(1, 2);
        let err = backtest_instrument("ABC", &bars, &short_crossover(), &BacktestConfig::default())
            .unwrap_err();
        assert!(matches!(err, SwingError::Fetch { .. }));
    }

    #[test]
    fn replay_enters_and_exits() {
        // dip then rally: sma1 crosses sma2 with sma2 > sma4, then a drop
        // pushes sma1 under sma3
        let closes = [10.0, 10.0, 10.0, 10.0, 9.0, 12.0, 14.0, 16.0, 11.0, 10.0];
        let bars = make_bars(&closes);
        let result =
            backtest_instrument("ABC", &bars, &short_crossover(), &BacktestConfig::default())
                .unwrap();

        assert_eq!(result.bars, closes.len());
        assert!(!result.trades.is_empty());
        let first = &result.trades[0];
        assert_eq!(first.instrument, "ABC");
        assert!(first.exit_time > first.entry_time);
        assert!(matches!(
            first.reason,
            ExitReason::SignalExit | ExitReason::StopLoss
        ));
    }

    struct OneInstrument(Vec<Bar>);

    impl BarSource for OneInstrument {
        fn fetch(&self, instrument: &str, _: Interval, _: usize) -> Result<Vec<Bar>, SwingError> {
            if instrument == "ABC" {
                Ok(self.0.clone())
            } else {
                Err(SwingError::Fetch {
                    instrument: instrument.to_string(),
                    reason: "not found".into(),
                })
            }
        }
    }

    #[test]
    fn run_backtest_isolates_failures() {
        let source = OneInstrument(make_bars(&[10.0, 10.0, 10.0, 10.0, 9.0, 12.0, 14.0, 16.0, 11.0, 10.0]));
        let instruments = vec!["ABC".to_string(), "XYZ".to_string()];
        let result = run_backtest(
            &source,
            &instruments,
            Interval::Hour,
            &short_crossover(),
            &BacktestConfig::default(),
        );

        assert_eq!(result.instruments.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].0, "XYZ");
        let report = result.report(100_000.0);
        assert_eq!(report.total_trades, result.trades().len());
    }

    #[test]
    fn flat_prices_trade_nothing() {
        let bars = make_bars(&[10.0; 12]);
        let result =
            backtest_instrument("ABC", &bars, &short_crossover(), &BacktestConfig::default())
                .unwrap();
        assert!(result.trades.is_empty());
        assert!(result.open_at_end.is_none());
    }
}
