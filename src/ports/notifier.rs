//! Notification port trait.

use crate::domain::error::SwingError;

/// Best-effort message delivery. Callers log and drop failures.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<(), SwingError>;
}
