//! Domain error types.

use crate::domain::ledger::LedgerError;

/// Top-level error type for swingtrader.
#[derive(Debug, thiserror::Error)]
pub enum SwingError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to fetch bars for {instrument}: {reason}")]
    Fetch { instrument: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("insufficient data for {instrument}: have {bars} bars, need {minimum}")]
    InsufficientData {
        instrument: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid risk: entry {entry} and stop {stop} give a non-positive risk per unit")]
    InvalidRisk { entry: f64, stop: f64 },

    #[error("position size rounds to zero (risk budget {risk_amount}, risk per unit {risk_per_unit})")]
    ZeroQuantity {
        risk_amount: f64,
        risk_per_unit: f64,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("ledger persistence error at {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("notification failed: {reason}")]
    Notification { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SwingError {
    /// Per-instrument failures that skip the instrument without aborting a pass.
    pub fn is_data_skip(&self) -> bool {
        matches!(
            self,
            SwingError::InsufficientData { .. } | SwingError::Fetch { .. }
        )
    }
}

impl From<&SwingError> for std::process::ExitCode {
    fn from(err: &SwingError) -> Self {
        let code: u8 = match err {
            SwingError::Io(_) | SwingError::Report { .. } => 1,
            SwingError::ConfigParse { .. }
            | SwingError::ConfigMissing { .. }
            | SwingError::ConfigInvalid { .. } => 2,
            SwingError::Persistence { .. } => 3,
            SwingError::Ledger(_) => 4,
            SwingError::Fetch { .. }
            | SwingError::Database { .. }
            | SwingError::InsufficientData { .. } => 5,
            SwingError::InvalidRisk { .. } | SwingError::ZeroQuantity { .. } => 6,
            SwingError::Notification { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
