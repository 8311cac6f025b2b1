//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod frame;
pub mod position;
pub mod ledger;
pub mod execution;
pub mod strategy;
pub mod signal;
pub mod backtest;
pub mod runner;
pub mod metrics;
pub mod config_validation;
pub mod error;
