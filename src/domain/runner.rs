//! One live evaluation pass over the open book and the watchlist.
//!
//! Instruments are processed one at a time against a single in-memory
//! ledger. A failing instrument is recorded and the pass moves on; the
//! ledger is written once, after the last instrument.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::domain::error::SwingError;
use crate::domain::execution::{apply_decision, TradeEvent};
use crate::domain::frame::latest_pair;
use crate::domain::ledger::{Ledger, LedgerConfig};
use crate::domain::signal::{Decision, SignalEvaluator};
use crate::ports::bar_source::{BarSource, Interval};
use crate::ports::ledger_store::LedgerStore;
use crate::ports::notifier::Notifier;

const FEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct PassSettings {
    pub watchlist: Vec<String>,
    pub interval: Interval,
    pub lookback: usize,
    pub ledger: LedgerConfig,
}

#[derive(Debug)]
pub enum InstrumentOutcome {
    Evaluated(Decision),
    /// Latest bar was already evaluated by an earlier pass.
    Unchanged,
    /// Not enough data or the source failed; nothing was touched.
    Skipped(SwingError),
    Failed(SwingError),
}

#[derive(Debug, Default)]
pub struct PassReport {
    pub outcomes: Vec<(String, InstrumentOutcome)>,
    /// Event lines produced this pass, oldest first.
    pub messages: Vec<String>,
    pub notification_failures: usize,
}

impl PassReport {
    pub fn outcome(&self, instrument: &str) -> Option<&InstrumentOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == instrument)
            .map(|(_, outcome)| outcome)
    }

    pub fn evaluated(&self) -> usize {
        self.count(|o| matches!(o, InstrumentOutcome::Evaluated(_)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, InstrumentOutcome::Unchanged))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, InstrumentOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, InstrumentOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&InstrumentOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Open positions first so exits are never starved by watchlist edits,
/// then the watchlist in configured order. Each instrument appears once.
pub fn pass_order(ledger: &Ledger, watchlist: &[String]) -> Vec<String> {
    let mut order: Vec<String> = ledger
        .open_positions()
        .map(|p| p.instrument.clone())
        .collect();
    for instrument in watchlist {
        if !order.contains(instrument) {
            order.push(instrument.clone());
        }
    }
    order
}

pub struct LivePass<'a> {
    source: &'a dyn BarSource,
    notifier: &'a dyn Notifier,
    evaluator: &'a SignalEvaluator,
    settings: &'a PassSettings,
}

impl<'a> LivePass<'a> {
    pub fn new(
        source: &'a dyn BarSource,
        notifier: &'a dyn Notifier,
        evaluator: &'a SignalEvaluator,
        settings: &'a PassSettings,
    ) -> Self {
        LivePass {
            source,
            notifier,
            evaluator,
            settings,
        }
    }

    /// Runs every instrument against `ledger`. Never fails as a whole.
    pub fn run(&self, ledger: &mut Ledger) -> PassReport {
        let mut report = PassReport::default();

        for instrument in pass_order(ledger, &self.settings.watchlist) {
            let outcome = match self.process(ledger, &instrument, &mut report) {
                Ok(outcome) => outcome,
                Err(e) if e.is_data_skip() => {
                    warn!(instrument = instrument.as_str(), error = %e, "instrument skipped");
                    InstrumentOutcome::Skipped(e)
                }
                Err(e) => {
                    warn!(instrument = instrument.as_str(), error = %e, "instrument failed");
                    InstrumentOutcome::Failed(e)
                }
            };
            report.outcomes.push((instrument, outcome));
        }

        info!(
            evaluated = report.evaluated(),
            unchanged = report.unchanged(),
            skipped = report.skipped(),
            failed = report.failed(),
            open = ledger.open_count(),
            capital = ledger.capital(),
            "pass complete"
        );
        report
    }

    fn process(
        &self,
        ledger: &mut Ledger,
        instrument: &str,
        report: &mut PassReport,
    ) -> Result<InstrumentOutcome, SwingError> {
        let bars = self
            .source
            .fetch(instrument, self.settings.interval, self.settings.lookback)?;
        let (previous, current) = latest_pair(instrument, &bars, &self.evaluator.indicators())?;
        let timestamp = current.bar.timestamp;

        if ledger
            .last_evaluated(instrument)
            .is_some_and(|seen| seen >= timestamp)
        {
            return Ok(InstrumentOutcome::Unchanged);
        }

        let decision = self
            .evaluator
            .evaluate(&current, &previous, ledger.position(instrument));
        let event = apply_decision(ledger, instrument, &decision, &current.bar)?;
        ledger.mark_evaluated(instrument, timestamp);
        debug!(
            instrument,
            time = %timestamp,
            decision = decision.label(),
            state = ?ledger.state_of(instrument),
            "evaluated"
        );

        self.publish(ledger, &event, timestamp, report);
        Ok(InstrumentOutcome::Evaluated(decision))
    }

    fn publish(
        &self,
        ledger: &mut Ledger,
        event: &TradeEvent,
        timestamp: NaiveDateTime,
        report: &mut PassReport,
    ) {
        let Some(message) = event.message() else {
            return;
        };
        ledger.record_signal(format!(
            "[{}] {}",
            timestamp.format(FEED_TIME_FORMAT),
            message
        ));
        if let Err(e) = self.notifier.notify(&message) {
            warn!(error = %e, "notification dropped");
            report.notification_failures += 1;
        }
        report.messages.push(message);
    }
}

/// Loads the ledger, runs one pass and saves the result once.
pub fn run_pass(
    source: &dyn BarSource,
    store: &dyn LedgerStore,
    notifier: &dyn Notifier,
    evaluator: &SignalEvaluator,
    settings: &PassSettings,
) -> Result<PassReport, SwingError> {
    let mut ledger = match store.load()? {
        Some(state) => Ledger::restore(state, settings.ledger),
        None => {
            info!(capital = evaluator.risk().capital, "starting a fresh ledger");
            Ledger::new(evaluator.risk().capital, settings.ledger)
        }
    };

    let report = LivePass::new(source, notifier, evaluator, settings).run(&mut ledger);
    store.save(ledger.state())?;
    Ok(report)
}
