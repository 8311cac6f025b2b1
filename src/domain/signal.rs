//! Signal evaluation: turns the latest pair of indicator frames and the
//! current position into a single [`Decision`].
//!
//! Evaluation is pure. Calling it twice with the same inputs yields the same
//! decision; repeated application is guarded by the ledger.

use tracing::debug;

use crate::domain::execution::{position_size, RiskConfig};
use crate::domain::frame::IndicatorFrame;
use crate::domain::indicator::{IndicatorType, Trend};
use crate::domain::position::{Direction, ExitReason, Position, PositionStatus};
use crate::domain::strategy::{
    BreakoutRef, MaCrossover, Strategy, SupertrendBreakout, TrailingConfig,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    None,
    EnterLong {
        price: f64,
        stop: f64,
        quantity: f64,
    },
    EnterShort {
        price: f64,
        stop: f64,
        quantity: f64,
    },
    Exit {
        price: f64,
        reason: ExitReason,
    },
    PartialExit {
        quantity: f64,
        price: f64,
        new_stop: f64,
    },
    Trail {
        new_stop: f64,
    },
}

impl Decision {
    pub fn is_none(&self) -> bool {
        matches!(self, Decision::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::None => "NONE",
            Decision::EnterLong { .. } => "ENTER_LONG",
            Decision::EnterShort { .. } => "ENTER_SHORT",
            Decision::Exit { .. } => "EXIT",
            Decision::PartialExit { .. } => "PARTIAL_EXIT",
            Decision::Trail { .. } => "TRAIL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    strategy: Strategy,
    risk: RiskConfig,
    trailing: TrailingConfig,
}

impl SignalEvaluator {
    pub fn new(strategy: Strategy, risk: RiskConfig, trailing: TrailingConfig) -> Self {
        SignalEvaluator {
            strategy,
            risk,
            trailing,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    pub fn indicators(&self) -> Vec<IndicatorType> {
        self.strategy.indicators()
    }

    pub fn evaluate(
        &self,
        current: &IndicatorFrame,
        previous: &IndicatorFrame,
        position: Option<&Position>,
    ) -> Decision {
        match position {
            Some(pos) => self.manage(current, previous, pos),
            None => self.entry(current, previous),
        }
    }

    fn manage(
        &self,
        current: &IndicatorFrame,
        previous: &IndicatorFrame,
        pos: &Position,
    ) -> Decision {
        let bar = &current.bar;
        let direction = pos.direction;
        let r = pos.r_multiple(direction.favourable_extreme(bar));
        let stop = self.trailed_stop(pos, r);

        if direction.stop_breached(bar, stop) {
            return Decision::Exit {
                price: stop,
                reason: ExitReason::StopLoss,
            };
        }

        if let Some(reason) = self.strategy_exit(current, previous, direction) {
            return Decision::Exit {
                price: bar.close,
                reason,
            };
        }

        if let Some(partial) = self.partial(pos, r, stop) {
            return partial;
        }

        if stop != pos.stop {
            Decision::Trail { new_stop: stop }
        } else {
            Decision::None
        }
    }

    /// Ratcheted stop for the reward reached on this bar.
    fn trailed_stop(&self, pos: &Position, r: f64) -> f64 {
        if !self.trailing.enabled {
            return pos.stop;
        }
        let candidate = if r >= self.trailing.lock_r {
            pos.price_at_r(self.trailing.lock_level_r)
        } else if r >= self.trailing.breakeven_r {
            pos.entry_price
        } else {
            return pos.stop;
        };
        pos.direction.tighter_stop(pos.stop, candidate)
    }

    fn partial(&self, pos: &Position, r: f64, stop: f64) -> Option<Decision> {
        let target_r = self.trailing.partial_r?;
        if pos.status != PositionStatus::Open || r < target_r {
            return None;
        }

        let raw = pos.quantity * self.trailing.partial_fraction;
        let quantity = if self.risk.fractional_qty {
            raw
        } else {
            raw.floor()
        };
        if !(quantity > 0.0 && quantity < pos.quantity) {
            debug!(
                instrument = %pos.instrument,
                quantity = pos.quantity,
                "partial target reached but slice is not tradable"
            );
            return None;
        }

        Some(Decision::PartialExit {
            quantity,
            price: pos.price_at_r(target_r),
            new_stop: pos.direction.tighter_stop(stop, pos.entry_price),
        })
    }

    fn strategy_exit(
        &self,
        current: &IndicatorFrame,
        previous: &IndicatorFrame,
        direction: Direction,
    ) -> Option<ExitReason> {
        match &self.strategy {
            Strategy::MaCrossover(s) => {
                let crossed = match direction {
                    Direction::Long => crossed_below(current, previous, &s.exit_fast, &s.exit_slow),
                    Direction::Short => crossed_above(current, previous, &s.exit_fast, &s.exit_slow),
                };
                crossed.then_some(ExitReason::SignalExit)
            }
            Strategy::Supertrend(s) => {
                let (line, _) = current.supertrend(&s.supertrend)?;
                let close = current.bar.close;
                // a close on the line already counts as lost trend
                let flipped = match direction {
                    Direction::Long => close <= line,
                    Direction::Short => close >= line,
                };
                flipped.then_some(ExitReason::TrendFlip)
            }
        }
    }

    fn entry(&self, current: &IndicatorFrame, previous: &IndicatorFrame) -> Decision {
        let long_stop = match &self.strategy {
            Strategy::MaCrossover(s) => crossover_entry(s, current, previous, Direction::Long),
            Strategy::Supertrend(s) => supertrend_entry(s, current, previous),
        };
        if let Some(stop) = long_stop {
            return self.sized(current, Direction::Long, stop);
        }

        if let Strategy::MaCrossover(s) = &self.strategy {
            if s.allow_shorting {
                if let Some(stop) = crossover_entry(s, current, previous, Direction::Short) {
                    return self.sized(current, Direction::Short, stop);
                }
            }
        }
        Decision::None
    }

    fn sized(&self, current: &IndicatorFrame, direction: Direction, stop: f64) -> Decision {
        let price = current.bar.close;
        match position_size(&self.risk, direction, price, stop) {
            Ok(quantity) => match direction {
                Direction::Long => Decision::EnterLong {
                    price,
                    stop,
                    quantity,
                },
                Direction::Short => Decision::EnterShort {
                    price,
                    stop,
                    quantity,
                },
            },
            Err(e) => {
                debug!(%direction, price, stop, error = %e, "entry signal rejected");
                Decision::None
            }
        }
    }
}

fn crossed_above(
    current: &IndicatorFrame,
    previous: &IndicatorFrame,
    fast: &IndicatorType,
    slow: &IndicatorType,
) -> bool {
    match (
        previous.value(fast),
        previous.value(slow),
        current.value(fast),
        current.value(slow),
    ) {
        (Some(pf), Some(ps), Some(cf), Some(cs)) => pf <= ps && cf > cs,
        _ => false,
    }
}

fn crossed_below(
    current: &IndicatorFrame,
    previous: &IndicatorFrame,
    fast: &IndicatorType,
    slow: &IndicatorType,
) -> bool {
    match (
        previous.value(fast),
        previous.value(slow),
        current.value(fast),
        current.value(slow),
    ) {
        (Some(pf), Some(ps), Some(cf), Some(cs)) => pf >= ps && cf < cs,
        _ => false,
    }
}

/// Strict ordering of the trend averages; undefined values fail alignment.
fn trend_aligned(frame: &IndicatorFrame, trend: &[IndicatorType], direction: Direction) -> bool {
    let values: Option<Vec<f64>> = trend.iter().map(|t| frame.value(t)).collect();
    match values {
        Some(v) => v.windows(2).all(|w| match direction {
            Direction::Long => w[0] > w[1],
            Direction::Short => w[0] < w[1],
        }),
        None => false,
    }
}

fn clears_breakouts(
    current: &IndicatorFrame,
    previous: &IndicatorFrame,
    breakouts: &[BreakoutRef],
    direction: Direction,
) -> bool {
    let close = current.bar.close;
    breakouts.iter().all(|b| {
        let level = match b {
            BreakoutRef::PreviousBar => Some(direction.favourable_extreme(&previous.bar)),
            BreakoutRef::Indicator(i) => current.value(i),
        };
        match (level, direction) {
            (Some(l), Direction::Long) => close > l,
            (Some(l), Direction::Short) => close < l,
            (None, _) => false,
        }
    })
}

/// Initial stop when every crossover entry condition holds.
fn crossover_entry(
    s: &MaCrossover,
    current: &IndicatorFrame,
    previous: &IndicatorFrame,
    direction: Direction,
) -> Option<f64> {
    if !trend_aligned(current, &s.trend, direction) {
        return None;
    }
    let triggered = match direction {
        Direction::Long => crossed_above(current, previous, &s.trigger_fast, &s.trigger_slow),
        Direction::Short => crossed_below(current, previous, &s.trigger_fast, &s.trigger_slow),
    };
    if !triggered || !clears_breakouts(current, previous, &s.breakouts, direction) {
        return None;
    }
    let anchor = current.value(&s.trigger_slow)?;
    Some(anchor * (1.0 - direction.sign() * s.stop_buffer))
}

fn supertrend_entry(
    s: &SupertrendBreakout,
    current: &IndicatorFrame,
    previous: &IndicatorFrame,
) -> Option<f64> {
    let (line, trend) = current.supertrend(&s.supertrend)?;
    let close = current.bar.close;
    let in_zone = trend == Trend::Up && close > line && close <= line * (1.0 + s.max_extension);
    if in_zone && clears_breakouts(current, previous, &s.breakouts, Direction::Long) {
        Some(line)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use crate::domain::indicator::IndicatorValue;
    use chrono::{Duration, NaiveDate};

    fn bar_at(i: i64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap()
                + Duration::hours(i),
            open: close,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    fn flat_frame(i: i64, close: f64) -> IndicatorFrame {
        IndicatorFrame::new(bar_at(i, close, close, close))
    }

    fn simple(frame: IndicatorFrame, t: IndicatorType, v: f64) -> IndicatorFrame {
        frame.with(t, IndicatorValue::Simple(v))
    }

    fn crossover() -> MaCrossover {
        MaCrossover {
            trend: vec![IndicatorType::ema(21), IndicatorType::ema(50)],
            trigger_fast: IndicatorType::ema(10),
            trigger_slow: IndicatorType::ema(21),
            exit_fast: IndicatorType::ema(5),
            exit_slow: IndicatorType::ema(10),
            stop_buffer: 0.001,
            breakouts: Vec::new(),
            allow_shorting: true,
        }
    }

    fn evaluator(strategy: Strategy) -> SignalEvaluator {
        SignalEvaluator::new(strategy, RiskConfig::default(), TrailingConfig::default())
    }

    /// fast/slow triggers plus trend values on a frame
    fn ma_frame(i: i64, close: f64, e5: f64, e10: f64, e21: f64, e50: f64) -> IndicatorFrame {
        let f = flat_frame(i, close);
        let f = simple(f, IndicatorType::ema(5), e5);
        let f = simple(f, IndicatorType::ema(10), e10);
        let f = simple(f, IndicatorType::ema(21), e21);
        simple(f, IndicatorType::ema(50), e50)
    }

    fn long_position(entry: f64, stop: f64, qty: f64) -> Position {
        Position::open("TEST", Direction::Long, entry, stop, qty, bar_at(0, 0.0, 0.0, 0.0).timestamp)
    }

    fn short_position(entry: f64, stop: f64, qty: f64) -> Position {
        Position::open("TEST", Direction::Short, entry, stop, qty, bar_at(0, 0.0, 0.0, 0.0).timestamp)
    }

    mod entries {
        use super::*;

        #[test]
        fn long_on_aligned_cross() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            let prev = ma_frame(0, 100.0, 99.0, 98.0, 98.0, 95.0);
            let curr = ma_frame(1, 101.0, 100.0, 98.5, 98.2, 95.0);

            match ev.evaluate(&curr, &prev, None) {
                Decision::EnterLong {
                    price,
                    stop,
                    quantity,
                } => {
                    assert_eq!(price, 101.0);
                    assert!((stop - 98.2 * 0.999).abs() < 1e-9);
                    let expected = (10_000.0 / (101.0 - stop)).floor();
                    assert_eq!(quantity, expected);
                }
                other => panic!("expected long entry, got {:?}", other),
            }
        }

        #[test]
        fn cross_is_edge_triggered() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            // fast already above slow on the previous bar
            let prev = ma_frame(0, 100.0, 99.0, 98.5, 98.0, 95.0);
            let curr = ma_frame(1, 101.0, 100.0, 98.7, 98.2, 95.0);
            assert_eq!(ev.evaluate(&curr, &prev, None), Decision::None);
        }

        #[test]
        fn misaligned_trend_blocks_entry() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            let prev = ma_frame(0, 100.0, 99.0, 98.0, 98.0, 99.0);
            let curr = ma_frame(1, 101.0, 100.0, 98.5, 98.2, 99.0);
            assert_eq!(ev.evaluate(&curr, &prev, None), Decision::None);
        }

        #[test]
        fn short_on_mirrored_cross() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            let prev = ma_frame(0, 100.0, 101.0, 102.0, 102.0, 105.0);
            let curr = ma_frame(1, 99.0, 100.0, 101.5, 101.8, 105.0);
            match ev.evaluate(&curr, &prev, None) {
                Decision::EnterShort { stop, .. } => {
                    assert!((stop - 101.8 * 1.001).abs() < 1e-9)
                }
                other => panic!("expected short entry, got {:?}", other),
            }
        }

        #[test]
        fn shorting_can_be_disabled() {
            let mut s = crossover();
            s.allow_shorting = false;
            let ev = evaluator(Strategy::MaCrossover(s));
            let prev = ma_frame(0, 100.0, 101.0, 102.0, 102.0, 105.0);
            let curr = ma_frame(1, 99.0, 100.0, 101.5, 101.8, 105.0);
            assert_eq!(ev.evaluate(&curr, &prev, None), Decision::None);
        }

        #[test]
        fn breakout_reference_must_be_cleared() {
            let mut s = crossover();
            s.breakouts = vec![BreakoutRef::PreviousBar];
            let ev = evaluator(Strategy::MaCrossover(s));

            let prev = ma_frame(0, 100.0, 99.0, 98.0, 98.0, 95.0);
            let mut prev_tall = prev.clone();
            prev_tall.bar.high = 105.0;
            let curr = ma_frame(1, 101.0, 100.0, 98.5, 98.2, 95.0);

            assert!(matches!(
                ev.evaluate(&curr, &prev, None),
                Decision::EnterLong { .. }
            ));
            assert_eq!(ev.evaluate(&curr, &prev_tall, None), Decision::None);
        }

        #[test]
        fn undefined_indicators_mean_no_entry() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            assert_eq!(
                ev.evaluate(&flat_frame(1, 100.0), &flat_frame(0, 100.0), None),
                Decision::None
            );
        }

        #[test]
        fn zero_risk_entry_is_none() {
            let mut s = crossover();
            s.stop_buffer = 0.0;
            let ev = evaluator(Strategy::MaCrossover(s));
            // stop == close when the slow trigger sits at the close
            let prev = ma_frame(0, 100.0, 99.0, 98.0, 98.0, 95.0);
            let curr = ma_frame(1, 98.2, 100.0, 98.5, 98.2, 95.0);
            assert_eq!(ev.evaluate(&curr, &prev, None), Decision::None);
        }
    }

    mod supertrend {
        use super::*;

        fn st_frame(i: i64, high: f64, close: f64, line: f64, trend: Trend, sma_high: f64) -> IndicatorFrame {
            let s = SupertrendBreakout::default();
            let f = IndicatorFrame::new(bar_at(i, high, close - 1.0, close))
                .with(s.supertrend, IndicatorValue::Supertrend { value: line, trend });
            match s.breakouts[1] {
                BreakoutRef::Indicator(t) => f.with(t, IndicatorValue::Simple(sma_high)),
                BreakoutRef::PreviousBar => f,
            }
        }

        fn ev() -> SignalEvaluator {
            evaluator(Strategy::Supertrend(SupertrendBreakout::default()))
        }

        #[test]
        fn pullback_breakout_enters_with_line_as_stop() {
            let prev = st_frame(0, 102.0, 101.0, 98.0, Trend::Up, 100.0);
            let curr = st_frame(1, 104.0, 103.0, 99.0, Trend::Up, 100.0);
            match ev().evaluate(&curr, &prev, None) {
                Decision::EnterLong { price, stop, quantity } => {
                    assert_eq!(price, 103.0);
                    assert_eq!(stop, 99.0);
                    assert_eq!(quantity, 2500.0);
                }
                other => panic!("expected entry, got {:?}", other),
            }
        }

        #[test]
        fn overextended_close_is_skipped() {
            let prev = st_frame(0, 102.0, 101.0, 90.0, Trend::Up, 100.0);
            // 103 > 90 * 1.05
            let curr = st_frame(1, 104.0, 103.0, 90.0, Trend::Up, 100.0);
            assert_eq!(ev().evaluate(&curr, &prev, None), Decision::None);
        }

        #[test]
        fn close_must_beat_previous_high_and_sma_of_highs() {
            let prev = st_frame(0, 103.5, 101.0, 98.0, Trend::Up, 100.0);
            let curr = st_frame(1, 104.0, 103.0, 99.0, Trend::Up, 100.0);
            assert_eq!(ev().evaluate(&curr, &prev, None), Decision::None);

            let prev = st_frame(0, 102.0, 101.0, 98.0, Trend::Up, 103.5);
            let curr = st_frame(1, 104.0, 103.0, 99.0, Trend::Up, 103.5);
            assert_eq!(ev().evaluate(&curr, &prev, None), Decision::None);
        }

        #[test]
        fn close_below_line_exits_on_flip() {
            let pos = long_position(100.0, 90.0, 10.0);
            let prev = st_frame(0, 102.0, 101.0, 95.0, Trend::Up, 100.0);
            let curr = st_frame(1, 99.0, 97.5, 98.0, Trend::Down, 100.0);
            assert_eq!(
                ev().evaluate(&curr, &prev, Some(&pos)),
                Decision::Exit {
                    price: 97.5,
                    reason: ExitReason::TrendFlip
                }
            );
        }

        #[test]
        fn close_on_the_line_exits() {
            let pos = long_position(100.0, 90.0, 10.0);
            let prev = st_frame(0, 102.0, 101.0, 95.0, Trend::Up, 100.0);
            let curr = st_frame(1, 99.0, 98.0, 98.0, Trend::Up, 100.0);
            assert_eq!(
                ev().evaluate(&curr, &prev, Some(&pos)),
                Decision::Exit {
                    price: 98.0,
                    reason: ExitReason::TrendFlip
                }
            );
        }
    }

    mod management {
        use super::*;

        fn no_exit_ev() -> SignalEvaluator {
            evaluator(Strategy::Supertrend(SupertrendBreakout::default()))
        }

        #[test]
        fn breakeven_ratchet_scenario() {
            // closes 10,10,10,12,15,9,8; long from 12 with stop 10
            let pos = long_position(12.0, 10.0, 100.0);
            let prev = flat_frame(3, 12.0);
            let curr = flat_frame(4, 15.0);

            let decision = no_exit_ev().evaluate(&curr, &prev, Some(&pos));
            assert_eq!(decision, Decision::Trail { new_stop: 12.0 });

            let mut trailed = pos.clone();
            trailed.stop = 12.0;
            let decision = no_exit_ev().evaluate(&flat_frame(5, 9.0), &curr, Some(&trailed));
            assert_eq!(
                decision,
                Decision::Exit {
                    price: 12.0,
                    reason: ExitReason::StopLoss
                }
            );
        }

        #[test]
        fn lock_level_at_two_r() {
            let pos = long_position(100.0, 95.0, 10.0);
            let curr = IndicatorFrame::new(bar_at(1, 110.0, 106.0, 108.0));
            assert_eq!(
                no_exit_ev().evaluate(&curr, &flat_frame(0, 100.0), Some(&pos)),
                Decision::Trail { new_stop: 105.0 }
            );
        }

        #[test]
        fn short_ratchet_uses_low() {
            let pos = short_position(100.0, 105.0, 10.0);
            let curr = IndicatorFrame::new(bar_at(1, 99.0, 94.0, 96.0));
            assert_eq!(
                no_exit_ev().evaluate(&curr, &flat_frame(0, 100.0), Some(&pos)),
                Decision::Trail { new_stop: 100.0 }
            );
        }

        #[test]
        fn ratchet_never_loosens() {
            let mut pos = long_position(100.0, 95.0, 10.0);
            pos.stop = 106.0;
            // 2R reached, candidate 105 is looser than 106
            let curr = IndicatorFrame::new(bar_at(1, 110.0, 107.0, 108.0));
            assert_eq!(
                no_exit_ev().evaluate(&curr, &flat_frame(0, 100.0), Some(&pos)),
                Decision::None
            );
        }

        #[test]
        fn disabled_trailing_holds_stop() {
            let ev = SignalEvaluator::new(
                Strategy::Supertrend(SupertrendBreakout::default()),
                RiskConfig::default(),
                TrailingConfig {
                    enabled: false,
                    ..Default::default()
                },
            );
            let pos = long_position(100.0, 95.0, 10.0);
            let curr = IndicatorFrame::new(bar_at(1, 110.0, 104.0, 108.0));
            assert_eq!(ev.evaluate(&curr, &flat_frame(0, 100.0), Some(&pos)), Decision::None);
        }

        #[test]
        fn stop_breach_beats_signal_exit() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            let pos = long_position(100.0, 95.0, 10.0);
            let prev = ma_frame(0, 100.0, 99.0, 98.0, 97.0, 95.0);
            let mut curr = ma_frame(1, 96.0, 97.0, 98.0, 97.0, 95.0);
            curr.bar.low = 94.0;
            assert_eq!(
                ev.evaluate(&curr, &prev, Some(&pos)),
                Decision::Exit {
                    price: 95.0,
                    reason: ExitReason::StopLoss
                }
            );
        }

        #[test]
        fn exit_cross_closes_at_close() {
            let ev = evaluator(Strategy::MaCrossover(crossover()));
            let pos = long_position(100.0, 95.0, 10.0);
            let prev = ma_frame(0, 100.0, 99.0, 98.0, 97.0, 95.0);
            let curr = ma_frame(1, 99.5, 97.5, 98.0, 97.0, 95.0);
            assert_eq!(
                ev.evaluate(&curr, &prev, Some(&pos)),
                Decision::Exit {
                    price: 99.5,
                    reason: ExitReason::SignalExit
                }
            );
        }

        #[test]
        fn partial_target_takes_slice_once() {
            let ev = SignalEvaluator::new(
                Strategy::Supertrend(SupertrendBreakout::default()),
                RiskConfig::default(),
                TrailingConfig {
                    partial_r: Some(1.5),
                    ..Default::default()
                },
            );
            let pos = long_position(100.0, 95.0, 10.0);
            let curr = IndicatorFrame::new(bar_at(1, 108.0, 104.0, 107.0));
            assert_eq!(
                ev.evaluate(&curr, &flat_frame(0, 100.0), Some(&pos)),
                Decision::PartialExit {
                    quantity: 5.0,
                    price: 107.5,
                    new_stop: 100.0
                }
            );

            let mut partial = pos.clone();
            partial.status = PositionStatus::Partial;
            partial.quantity = 5.0;
            partial.stop = 100.0;
            assert_eq!(ev.evaluate(&curr, &flat_frame(0, 100.0), Some(&partial)), Decision::None);
        }

        #[test]
        fn evaluation_is_repeatable() {
            let pos = long_position(12.0, 10.0, 100.0);
            let prev = flat_frame(3, 12.0);
            let curr = flat_frame(4, 15.0);
            let ev = no_exit_ev();
            assert_eq!(
                ev.evaluate(&curr, &prev, Some(&pos)),
                ev.evaluate(&curr, &prev, Some(&pos))
            );
        }
    }

    #[test]
    fn labels() {
        assert_eq!(Decision::None.label(), "NONE");
        assert_eq!(Decision::Trail { new_stop: 1.0 }.label(), "TRAIL");
        assert!(Decision::None.is_none());
    }
}
