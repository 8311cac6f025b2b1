//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::console_report::{render_dashboard, render_instrument_summary, render_performance};
use crate::adapters::csv_adapter::CsvBarSource;
use crate::adapters::csv_trade_log::CsvTradeLog;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_ledger_adapter::JsonLedgerStore;
use crate::adapters::log_notifier::LogNotifier;
use crate::domain::backtest::{run_backtest as replay_all, BacktestConfig};
use crate::domain::config_validation::{load_config, AppConfig, DataSourceKind, MarketConfig, TelegramConfig};
use crate::domain::error::SwingError;
use crate::domain::ledger::Ledger;
use crate::domain::runner::{run_pass, InstrumentOutcome, PassSettings};
use crate::domain::signal::SignalEvaluator;
use crate::ports::bar_source::BarSource;
use crate::ports::ledger_store::LedgerStore;
use crate::ports::notifier::Notifier;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "swingtrader", about = "Trend-following swing signal engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay history for the watchlist and print performance
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Restrict to these instruments instead of the watchlist
        #[arg(short, long)]
        instrument: Vec<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// CSV trade log destination (overrides [backtest] trade_log)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate the latest bar of every instrument once and persist the ledger
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the persisted portfolio dashboard
    Report {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Check a configuration file without fetching data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Copy CSV history from [market] csv_dir into the SQLite bar store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        /// Instruments to copy; every CSV file in the directory when omitted
        #[arg(short, long)]
        instrument: Vec<String>,
    },
    /// Send a test message through the configured notifier
    NotifyTest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "swingtrader notification test")]
        message: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            instrument,
            start,
            end,
            output,
        } => load(&config).and_then(|app| {
            run_backtest(&app, &instrument, start, end, output.as_deref())
        }),
        Command::Run { config } => load(&config).and_then(|app| run_live(&app)),
        Command::Report { config } => load(&config).and_then(|app| run_report(&app)),
        Command::Validate { config } => load(&config).map(|app| print_validation(&app)),
        Command::Import { config, instrument } => {
            load(&config).and_then(|app| run_import(&app, &instrument))
        }
        Command::NotifyTest { config, message } => {
            load(&config).and_then(|app| run_notify_test(&app, &message))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Reads and validates the INI file, then starts logging with its filter.
pub fn load(path: &Path) -> Result<AppConfig, SwingError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let app = load_config(&adapter)?;
    init_logging(&app.log_filter);
    Ok(app)
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr so
/// report tables on stdout stay clean.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // a second init (tests, repeated calls) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn evaluator(app: &AppConfig) -> SignalEvaluator {
    SignalEvaluator::new(app.strategy.clone(), app.risk, app.trailing)
}

pub fn bar_source(market: &MarketConfig) -> Result<Box<dyn BarSource>, SwingError> {
    match market.source {
        DataSourceKind::Csv => Ok(Box::new(CsvBarSource::new(market.csv_dir.clone()))),
        #[cfg(feature = "sqlite")]
        DataSourceKind::Sqlite => {
            use crate::adapters::sqlite_adapter::SqliteBarSource;
            Ok(Box::new(SqliteBarSource::from_path(&market.sqlite_path, 2)?))
        }
        #[cfg(feature = "http")]
        DataSourceKind::Yahoo => {
            use crate::adapters::yahoo_adapter::YahooBarSource;
            Ok(Box::new(YahooBarSource::new(
                &market.base_url,
                Duration::from_secs(market.timeout_secs),
            )?))
        }
        #[allow(unreachable_patterns)]
        other => Err(SwingError::ConfigInvalid {
            section: "market".into(),
            key: "source".into(),
            reason: format!("{:?} support was not compiled in", other),
        }),
    }
}

pub fn notifier(telegram: &TelegramConfig, timeout: Duration) -> Result<Box<dyn Notifier>, SwingError> {
    if !telegram.enabled {
        return Ok(Box::new(LogNotifier));
    }

    #[cfg(feature = "http")]
    {
        use crate::adapters::telegram_adapter::TelegramNotifier;
        Ok(Box::new(TelegramNotifier::new(telegram, timeout)?))
    }

    #[cfg(not(feature = "http"))]
    {
        let _ = timeout;
        Err(SwingError::ConfigInvalid {
            section: "telegram".into(),
            key: "enabled".into(),
            reason: "telegram requires the http feature".into(),
        })
    }
}

fn run_backtest(
    app: &AppConfig,
    instruments: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&Path>,
) -> Result<(), SwingError> {
    let instruments = if instruments.is_empty() {
        app.market.watchlist.clone()
    } else {
        instruments.to_vec()
    };

    let mut config = BacktestConfig::default();
    config.window = app.backtest.window;
    if start.is_some() {
        config.window.start_date = start;
    }
    if end.is_some() {
        config.window.end_date = end;
    }
    config.ledger.brokerage_rate = app.risk.brokerage_rate;

    let source = bar_source(&app.market)?;
    let evaluator = evaluator(app);
    info!(
        strategy = evaluator.strategy().name(),
        instruments = instruments.len(),
        interval = %app.market.interval,
        "running backtest"
    );

    let result = replay_all(source.as_ref(), &instruments, app.market.interval, &evaluator, &config);
    for (instrument, err) in &result.skipped {
        eprintln!("warning: skipping {} ({})", instrument, err);
    }
    if result.instruments.is_empty() {
        return Err(match result.skipped.into_iter().next() {
            Some((_, err)) => err,
            None => SwingError::ConfigMissing {
                section: "market".into(),
                key: "watchlist".into(),
            },
        });
    }

    let trades = result.trades();
    let report = result.report(app.risk.capital);

    let mut out = io::stdout().lock();
    render_performance(&mut out, &report)?;
    render_instrument_summary(&mut out, &trades)?;
    for r in &result.instruments {
        if let Some(pos) = &r.open_at_end {
            writeln!(
                out,
                "  {} still open: {} {} @ {:.2} (stop {:.2})",
                r.instrument, pos.direction, pos.quantity, pos.entry_price, pos.stop
            )?;
        }
    }

    if let Some(path) = output.or(app.backtest.trade_log.as_deref()) {
        CsvTradeLog.write(&trades, &report, path)?;
        eprintln!("Trade log written to: {}", path.display());
    }
    Ok(())
}

fn run_live(app: &AppConfig) -> Result<(), SwingError> {
    let source = bar_source(&app.market)?;
    let notifier = notifier(&app.telegram, Duration::from_secs(app.market.timeout_secs))?;
    let store = JsonLedgerStore::new(&app.ledger.path);
    let evaluator = evaluator(app);
    let settings = PassSettings {
        watchlist: app.market.watchlist.clone(),
        interval: app.market.interval,
        lookback: app.market.lookback,
        ledger: app.ledger_config(),
    };

    let report = run_pass(source.as_ref(), &store, notifier.as_ref(), &evaluator, &settings)?;

    let mut out = io::stdout().lock();
    for message in &report.messages {
        writeln!(out, "{}", message)?;
    }
    for (instrument, outcome) in &report.outcomes {
        if let InstrumentOutcome::Failed(e) = outcome {
            eprintln!("warning: {} failed ({})", instrument, e);
        }
    }
    writeln!(
        out,
        "{} evaluated, {} unchanged, {} skipped, {} failed",
        report.evaluated(),
        report.unchanged(),
        report.skipped(),
        report.failed()
    )?;
    Ok(())
}

fn run_report(app: &AppConfig) -> Result<(), SwingError> {
    let store = JsonLedgerStore::new(&app.ledger.path);
    let ledger = match store.load()? {
        Some(state) => Ledger::restore(state, app.ledger_config()),
        None => Ledger::new(app.risk.capital, app.ledger_config()),
    };

    let mut out = io::stdout().lock();
    render_dashboard(&mut out, &ledger)?;
    Ok(())
}

fn print_validation(app: &AppConfig) {
    let evaluator = evaluator(app);
    eprintln!("Strategy:    {}", evaluator.strategy().name());
    eprintln!(
        "Indicators:  {}",
        evaluator
            .indicators()
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!(
        "Shorting:    {}",
        if app.strategy.allows_shorting() { "allowed" } else { "off" }
    );
    eprintln!(
        "Risk:        {:.2} capital, {:.2}% per trade",
        app.risk.capital,
        app.risk.risk_fraction * 100.0
    );
    eprintln!(
        "Market:      {:?} {} ({} instruments)",
        app.market.source,
        app.market.interval,
        app.market.watchlist.len()
    );
    eprintln!("Ledger:      {}", app.ledger.path.display());
    eprintln!("Telegram:    {}", if app.telegram.enabled { "on" } else { "off" });
    eprintln!("\nConfiguration is valid.");
}

#[cfg(feature = "sqlite")]
fn run_import(app: &AppConfig, instruments: &[String]) -> Result<(), SwingError> {
    use crate::adapters::sqlite_adapter::SqliteBarSource;

    let csv = CsvBarSource::new(app.market.csv_dir.clone());
    let instruments = if instruments.is_empty() {
        csv.list_instruments()?
    } else {
        instruments.to_vec()
    };
    let interval = app.market.interval;
    let store = SqliteBarSource::from_path(&app.market.sqlite_path, 1)?;

    for instrument in &instruments {
        let bars = csv.fetch(instrument, interval, 0)?;
        let written = store.insert_bars(instrument, interval, &bars)?;
        info!(instrument = instrument.as_str(), bars = written, "imported");
        eprintln!("{:<14} {} bars", instrument, written);
    }

    let stored = store.list_instruments(interval)?;
    eprintln!(
        "{} instruments stored for {} in {}",
        stored.len(),
        interval,
        app.market.sqlite_path.display()
    );
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(_app: &AppConfig, _instruments: &[String]) -> Result<(), SwingError> {
    Err(SwingError::ConfigInvalid {
        section: "market".into(),
        key: "sqlite_path".into(),
        reason: "sqlite support was not compiled in".into(),
    })
}

fn run_notify_test(app: &AppConfig, message: &str) -> Result<(), SwingError> {
    let notifier = notifier(&app.telegram, Duration::from_secs(app.market.timeout_secs))?;
    notifier.notify(message)?;
    eprintln!("Notification sent.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backtest_arguments() {
        let cli = Cli::try_parse_from([
            "swingtrader",
            "backtest",
            "--config",
            "swing.ini",
            "-i",
            "TCS.NS",
            "-i",
            "INFY.NS",
            "--start",
            "2023-01-01",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                instrument, start, ..
            } => {
                assert_eq!(instrument, vec!["TCS.NS", "INFY.NS"]);
                assert_eq!(start, NaiveDate::from_ymd_opt(2023, 1, 1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_import_arguments() {
        let cli = Cli::try_parse_from(["swingtrader", "import", "-c", "swing.ini", "-i", "TCS.NS"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Import { instrument, .. } if instrument == vec!["TCS.NS".to_string()]
        ));
    }

    #[test]
    fn notify_test_has_default_message() {
        let cli =
            Cli::try_parse_from(["swingtrader", "notify-test", "--config", "swing.ini"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::NotifyTest { message, .. } if message == "swingtrader notification test"
        ));
    }

    #[test]
    fn missing_config_file_is_exit_code_two() {
        let code = run(Cli {
            command: Command::Validate {
                config: PathBuf::from("/nonexistent/swing.ini"),
            },
        });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn disabled_telegram_logs_only() {
        let notifier = notifier(&TelegramConfig::default(), Duration::from_secs(1)).unwrap();
        assert!(notifier.notify("hello").is_ok());
    }
}
