#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use swingtrader::domain::bar::Bar;
use swingtrader::domain::error::SwingError;
use swingtrader::domain::execution::RiskConfig;
use swingtrader::domain::indicator::IndicatorType;
use swingtrader::domain::ledger::{LedgerConfig, LedgerState};
use swingtrader::domain::runner::PassSettings;
use swingtrader::domain::signal::SignalEvaluator;
use swingtrader::domain::strategy::{MaCrossover, Strategy, TrailingConfig};
use swingtrader::ports::bar_source::{keep_last, BarSource, Interval};
use swingtrader::ports::ledger_store::LedgerStore;
use swingtrader::ports::notifier::Notifier;

/// Bar source backed by a map; instruments can be made to fail.
#[derive(Default)]
pub struct MockBarSource {
    pub data: RefCell<HashMap<String, Vec<Bar>>>,
    pub errors: HashMap<String, String>,
    pub fetches: Cell<usize>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.borrow_mut().insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }

    /// Appends a bar, as if the market printed a new one.
    pub fn push_bar(&self, instrument: &str, bar: Bar) {
        self.data
            .borrow_mut()
            .entry(instrument.to_string())
            .or_default()
            .push(bar);
    }
}

impl BarSource for MockBarSource {
    fn fetch(
        &self,
        instrument: &str,
        _interval: Interval,
        lookback: usize,
    ) -> Result<Vec<Bar>, SwingError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(reason) = self.errors.get(instrument) {
            return Err(SwingError::Fetch {
                instrument: instrument.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.data.borrow().get(instrument).cloned().unwrap_or_default();
        Ok(keep_last(bars, lookback))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) -> Result<(), SwingError> {
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _message: &str) -> Result<(), SwingError> {
        Err(SwingError::Notification {
            reason: "chat unreachable".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    pub state: RefCell<Option<LedgerState>>,
    pub saves: Cell<usize>,
    pub fail_save: bool,
}

impl MemoryLedgerStore {
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: RefCell::new(Some(state)),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_save: true,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> LedgerState {
        self.state.borrow().clone().expect("ledger was never saved")
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Option<LedgerState>, SwingError> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &LedgerState) -> Result<(), SwingError> {
        if self.fail_save {
            return Err(SwingError::Persistence {
                path: "memory".to_string(),
                reason: "disk full".to_string(),
            });
        }
        *self.state.borrow_mut() = Some(state.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
}

/// Hourly bar `i` hours after the start with explicit range.
pub fn bar(i: i64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: start_time() + Duration::hours(i),
        open: close,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Hourly bars with high = low = close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(i as i64, c, c, c))
        .collect()
}

/// Flat history, a dip and a rally: the final bar is a crossover entry
/// for [`small_crossover`].
pub const ENTRY_CLOSES: [f64; 6] = [10.0, 10.0, 10.0, 10.0, 9.0, 12.0];

/// Short-period crossover so fixtures stay a few bars long.
pub fn small_crossover() -> Strategy {
    Strategy::MaCrossover(MaCrossover {
        trend: vec![IndicatorType::sma(2), IndicatorType::sma(4)],
        trigger_fast: IndicatorType::sma(1),
        trigger_slow: IndicatorType::sma(2),
        exit_fast: IndicatorType::sma(1),
        exit_slow: IndicatorType::sma(3),
        stop_buffer: 0.05,
        breakouts: Vec::new(),
        allow_shorting: false,
    })
}

pub fn test_risk() -> RiskConfig {
    RiskConfig {
        capital: 100_000.0,
        risk_fraction: 0.01,
        brokerage_rate: 0.0,
        fractional_qty: false,
    }
}

pub fn test_evaluator() -> SignalEvaluator {
    SignalEvaluator::new(small_crossover(), test_risk(), TrailingConfig::default())
}

pub fn pass_settings(watchlist: &[&str]) -> PassSettings {
    PassSettings {
        watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
        interval: Interval::Hour,
        lookback: 0,
        ledger: LedgerConfig {
            brokerage_rate: 0.0,
            enforce_cash: true,
        },
    }
}
