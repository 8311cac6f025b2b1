//! Configuration loading and validation.
//!
//! Turns raw INI values into the immutable settings structs handed to the
//! evaluator, ledger and adapters. Every field is checked up front so a bad
//! file fails before any data is fetched.

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::domain::backtest::BacktestWindow;
use crate::domain::error::SwingError;
use crate::domain::execution::RiskConfig;
use crate::domain::indicator::IndicatorType;
use crate::domain::ledger::LedgerConfig;
use crate::domain::strategy::{
    BreakoutRef, MaCrossover, Strategy, SupertrendBreakout, TrailingConfig,
};
use crate::ports::bar_source::Interval;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Csv,
    Sqlite,
    Yahoo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    pub source: DataSourceKind,
    pub watchlist: Vec<String>,
    pub interval: Interval,
    /// Most recent bars requested per instrument; 0 means all.
    pub lookback: usize,
    pub csv_dir: PathBuf,
    pub sqlite_path: PathBuf,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    pub path: PathBuf,
    pub enforce_cash: bool,
}

/// One bot/chat pair. Different chats may be served by different bots.
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramRecipient {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub recipients: Vec<TelegramRecipient>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub window: BacktestWindow,
    pub trade_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub risk: RiskConfig,
    pub strategy: Strategy,
    pub trailing: TrailingConfig,
    pub market: MarketConfig,
    pub ledger: LedgerSettings,
    pub telegram: TelegramConfig,
    pub backtest: BacktestSettings,
    pub log_filter: String,
}

impl AppConfig {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            brokerage_rate: self.risk.brokerage_rate,
            enforce_cash: self.ledger.enforce_cash,
        }
    }
}

pub fn load_config(config: &dyn ConfigPort) -> Result<AppConfig, SwingError> {
    let risk = load_risk(config)?;
    Ok(AppConfig {
        risk,
        strategy: load_strategy(config)?,
        trailing: load_trailing(config)?,
        market: load_market(config)?,
        ledger: LedgerSettings {
            path: PathBuf::from(
                string_or(config, "ledger", "path", "portfolio.json"),
            ),
            enforce_cash: flag(config, "ledger", "enforce_cash", true)?,
        },
        telegram: load_telegram(config)?,
        backtest: load_backtest(config)?,
        log_filter: string_or(config, "logging", "filter", "info"),
    })
}

fn load_risk(config: &dyn ConfigPort) -> Result<RiskConfig, SwingError> {
    let defaults = RiskConfig::default();
    let capital = number(config, "account", "capital", defaults.capital)?;
    if capital <= 0.0 {
        return Err(invalid("account", "capital", "capital must be positive"));
    }
    let risk_fraction = number(config, "account", "risk_fraction", defaults.risk_fraction)?;
    if risk_fraction <= 0.0 || risk_fraction >= 1.0 {
        return Err(invalid(
            "account",
            "risk_fraction",
            "risk_fraction must be between 0 and 1",
        ));
    }
    let brokerage_rate = number(config, "account", "brokerage_rate", defaults.brokerage_rate)?;
    if !(0.0..1.0).contains(&brokerage_rate) {
        return Err(invalid(
            "account",
            "brokerage_rate",
            "brokerage_rate must be in [0, 1)",
        ));
    }
    Ok(RiskConfig {
        capital,
        risk_fraction,
        brokerage_rate,
        fractional_qty: flag(config, "account", "fractional_qty", false)?,
    })
}

fn load_strategy(config: &dyn ConfigPort) -> Result<Strategy, SwingError> {
    let kind = string_or(config, "strategy", "kind", "ma_crossover").to_lowercase();
    match kind.as_str() {
        "ma_crossover" | "crossover" => {
            let d = MaCrossover::default();
            let trend = match config.get_string("strategy", "trend") {
                Some(_) => indicator_list(config, "strategy", "trend")?,
                None => d.trend,
            };
            if trend.len() < 2 {
                return Err(invalid(
                    "strategy",
                    "trend",
                    "trend needs at least two averages ordered fast to slow",
                ));
            }
            let stop_buffer = number(config, "strategy", "stop_buffer", d.stop_buffer)?;
            if !(0.0..1.0).contains(&stop_buffer) {
                return Err(invalid("strategy", "stop_buffer", "stop_buffer must be in [0, 1)"));
            }
            Ok(Strategy::MaCrossover(MaCrossover {
                trend,
                trigger_fast: indicator(config, "trigger_fast", d.trigger_fast)?,
                trigger_slow: indicator(config, "trigger_slow", d.trigger_slow)?,
                exit_fast: indicator(config, "exit_fast", d.exit_fast)?,
                exit_slow: indicator(config, "exit_slow", d.exit_slow)?,
                stop_buffer,
                breakouts: breakouts(config, d.breakouts)?,
                allow_shorting: flag(config, "strategy", "allow_shorting", d.allow_shorting)?,
            }))
        }
        "supertrend" => {
            let d = SupertrendBreakout::default();
            let supertrend = indicator(config, "supertrend", d.supertrend)?;
            if !matches!(supertrend, IndicatorType::Supertrend { .. }) {
                return Err(invalid(
                    "strategy",
                    "supertrend",
                    "expected a token like supertrend:10:3",
                ));
            }
            let max_extension = number(config, "strategy", "max_extension", d.max_extension)?;
            if max_extension < 0.0 {
                return Err(invalid(
                    "strategy",
                    "max_extension",
                    "max_extension must be non-negative",
                ));
            }
            Ok(Strategy::Supertrend(SupertrendBreakout {
                supertrend,
                max_extension,
                breakouts: breakouts(config, d.breakouts)?,
            }))
        }
        other => Err(invalid(
            "strategy",
            "kind",
            &format!("unknown strategy '{}' (expected ma_crossover or supertrend)", other),
        )),
    }
}

fn load_trailing(config: &dyn ConfigPort) -> Result<TrailingConfig, SwingError> {
    let d = TrailingConfig::default();
    let breakeven_r = number(config, "trailing", "breakeven_r", d.breakeven_r)?;
    if breakeven_r <= 0.0 {
        return Err(invalid("trailing", "breakeven_r", "breakeven_r must be positive"));
    }
    let lock_r = number(config, "trailing", "lock_r", d.lock_r)?;
    if lock_r < breakeven_r {
        return Err(invalid(
            "trailing",
            "lock_r",
            "lock_r must not be below breakeven_r",
        ));
    }
    let lock_level_r = number(config, "trailing", "lock_level_r", d.lock_level_r)?;
    if lock_level_r < 0.0 || lock_level_r >= lock_r {
        return Err(invalid(
            "trailing",
            "lock_level_r",
            "lock_level_r must be in [0, lock_r)",
        ));
    }
    let partial_r = match config.get_string("trailing", "partial_r") {
        Some(raw) if !raw.trim().is_empty() => {
            let r = parse_number("trailing", "partial_r", &raw)?;
            if r <= 0.0 {
                return Err(invalid("trailing", "partial_r", "partial_r must be positive"));
            }
            Some(r)
        }
        _ => None,
    };
    let partial_fraction = number(config, "trailing", "partial_fraction", d.partial_fraction)?;
    if partial_fraction <= 0.0 || partial_fraction >= 1.0 {
        return Err(invalid(
            "trailing",
            "partial_fraction",
            "partial_fraction must be between 0 and 1",
        ));
    }
    Ok(TrailingConfig {
        enabled: flag(config, "trailing", "enabled", d.enabled)?,
        breakeven_r,
        lock_r,
        lock_level_r,
        partial_r,
        partial_fraction,
    })
}

fn load_market(config: &dyn ConfigPort) -> Result<MarketConfig, SwingError> {
    let watchlist = config.get_list("market", "watchlist");
    if watchlist.is_empty() {
        return Err(SwingError::ConfigMissing {
            section: "market".to_string(),
            key: "watchlist".to_string(),
        });
    }

    let source = match string_or(config, "market", "source", "csv").to_lowercase().as_str() {
        "csv" => DataSourceKind::Csv,
        "sqlite" => DataSourceKind::Sqlite,
        "yahoo" | "http" => DataSourceKind::Yahoo,
        other => {
            return Err(invalid(
                "market",
                "source",
                &format!("unknown source '{}' (expected csv, sqlite or yahoo)", other),
            ))
        }
    };

    let interval = string_or(config, "market", "interval", "1d")
        .parse::<Interval>()
        .map_err(|reason| invalid("market", "interval", &reason))?;

    let lookback = integer(config, "market", "lookback", 500)?;
    if lookback < 0 {
        return Err(invalid("market", "lookback", "lookback must be non-negative"));
    }
    let timeout_secs = integer(config, "market", "timeout_secs", 20)?;
    if timeout_secs <= 0 {
        return Err(invalid("market", "timeout_secs", "timeout_secs must be positive"));
    }

    Ok(MarketConfig {
        source,
        watchlist,
        interval,
        lookback: lookback as usize,
        csv_dir: PathBuf::from(string_or(config, "market", "csv_dir", "data")),
        sqlite_path: PathBuf::from(string_or(config, "market", "sqlite_path", "bars.db")),
        base_url: string_or(
            config,
            "market",
            "base_url",
            "https://query1.finance.yahoo.com",
        ),
        timeout_secs: timeout_secs as u64,
    })
}

fn load_telegram(config: &dyn ConfigPort) -> Result<TelegramConfig, SwingError> {
    let enabled = flag(config, "telegram", "enabled", false)?;
    let bot_token = string_or(config, "telegram", "bot_token", "");
    let chat_ids = config.get_list("telegram", "chat_ids");
    let missing = |key: &str| SwingError::ConfigMissing {
        section: "telegram".to_string(),
        key: key.to_string(),
    };

    if enabled && !chat_ids.is_empty() && bot_token.is_empty() {
        return Err(missing("bot_token"));
    }
    let mut recipients: Vec<TelegramRecipient> = chat_ids
        .into_iter()
        .map(|chat_id| TelegramRecipient {
            bot_token: bot_token.clone(),
            chat_id,
        })
        .collect();

    // `recipients = <bot_token>|<chat_id>, ...` for chats on other bots
    for entry in config.get_list("telegram", "recipients") {
        let pair = entry
            .split_once('|')
            .map(|(token, chat)| (token.trim(), chat.trim()))
            .filter(|(token, chat)| !token.is_empty() && !chat.is_empty());
        let Some((token, chat)) = pair else {
            return Err(invalid(
                "telegram",
                "recipients",
                &format!("'{}' is not <bot_token>|<chat_id>", entry),
            ));
        };
        recipients.push(TelegramRecipient {
            bot_token: token.to_string(),
            chat_id: chat.to_string(),
        });
    }

    if enabled && recipients.is_empty() {
        return Err(missing(if bot_token.is_empty() { "bot_token" } else { "chat_ids" }));
    }

    Ok(TelegramConfig {
        enabled,
        recipients,
        prefix: config
            .get_string("telegram", "prefix")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    })
}

fn load_backtest(config: &dyn ConfigPort) -> Result<BacktestSettings, SwingError> {
    let start_date = optional_date(config, "start_date")?;
    let end_date = optional_date(config, "end_date")?;
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s >= e {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(BacktestSettings {
        window: BacktestWindow {
            start_date,
            end_date,
        },
        trade_log: config
            .get_string("backtest", "trade_log")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from),
    })
}

fn optional_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, SwingError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "backtest",
                    key,
                    &format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

fn indicator(
    config: &dyn ConfigPort,
    key: &str,
    default: IndicatorType,
) -> Result<IndicatorType, SwingError> {
    match config.get_string("strategy", key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: crate::domain::indicator::IndicatorParseError| {
                invalid("strategy", key, &e.to_string())
            }),
        None => Ok(default),
    }
}

fn indicator_list(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Vec<IndicatorType>, SwingError> {
    config
        .get_list(section, key)
        .iter()
        .map(|token| {
            token
                .parse::<IndicatorType>()
                .map_err(|e| invalid(section, key, &e.to_string()))
        })
        .collect()
}

fn breakouts(
    config: &dyn ConfigPort,
    default: Vec<BreakoutRef>,
) -> Result<Vec<BreakoutRef>, SwingError> {
    if config.get_string("strategy", "breakouts").is_none() {
        return Ok(default);
    }
    config
        .get_list("strategy", "breakouts")
        .iter()
        .map(|token| {
            token
                .parse::<BreakoutRef>()
                .map_err(|e| invalid("strategy", "breakouts", &e.to_string()))
        })
        .collect()
}

/// Reads a number, rejecting malformed values instead of silently defaulting.
fn number(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, SwingError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => parse_number(section, key, &raw),
        _ => Ok(default),
    }
}

fn parse_number(section: &str, key: &str, raw: &str) -> Result<f64, SwingError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(section, key, &format!("'{}' is not a number", raw.trim()))),
    }
}

/// Reads a whole number; `5OO` is an error, not the default.
fn integer(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, SwingError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, &format!("'{}' is not a whole number", raw.trim()))),
        _ => Ok(default),
    }
}

fn flag(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, SwingError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(invalid(
            section,
            key,
            &format!("'{}' is not a boolean (true/false, yes/no, on/off, 1/0)", other),
        )),
    }
}

fn string_or(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> String {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn invalid(section: &str, key: &str, reason: &str) -> SwingError {
    SwingError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
