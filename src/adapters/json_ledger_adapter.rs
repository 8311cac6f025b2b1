//! JSON file ledger store.
//!
//! The whole ledger is one pretty-printed document. Saves go through a
//! sibling temp file and a rename so a crash never leaves a half-written
//! ledger behind.

use crate::domain::error::SwingError;
use crate::domain::ledger::LedgerState;
use crate::ports::ledger_store::LedgerStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> SwingError {
        SwingError::Persistence {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonLedgerStore {
    fn load(&self) -> Result<Option<LedgerState>, SwingError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no ledger file yet");
                return Ok(None);
            }
            Err(e) => return Err(self.error(e)),
        };

        // a corrupt ledger is never silently replaced with a fresh one
        let state: LedgerState = serde_json::from_str(&json)
            .map_err(|e: serde_json::Error| self.error(format!("corrupt ledger: {}", e)))?;

        info!(
            path = %self.path.display(),
            open = state.open.len(),
            closed = state.closed.len(),
            "ledger loaded"
        );
        Ok(Some(state))
    }

    fn save(&self, state: &LedgerState) -> Result<(), SwingError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e: serde_json::Error| self.error(e))?;

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| self.error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;

        debug!(path = %self.path.display(), capital = state.capital, "ledger saved");
        Ok(())
    }
}
