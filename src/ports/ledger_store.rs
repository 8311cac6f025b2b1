//! Ledger persistence port trait.

use crate::domain::error::SwingError;
use crate::domain::ledger::LedgerState;

/// Whole-document storage: `save` replaces everything `load` returns.
pub trait LedgerStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<LedgerState>, SwingError>;
    fn save(&self, state: &LedgerState) -> Result<(), SwingError>;
}
