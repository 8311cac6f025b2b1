//! Concrete adapter implementations for ports.

pub mod console_report;
pub mod csv_adapter;
pub mod csv_trade_log;
pub mod file_config_adapter;
pub mod json_ledger_adapter;
pub mod log_notifier;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "http")]
pub mod telegram_adapter;
#[cfg(feature = "http")]
pub mod yahoo_adapter;
