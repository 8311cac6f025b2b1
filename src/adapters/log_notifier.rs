//! Notifier that writes messages to the log only.
//!
//! Used when Telegram is disabled or the `http` feature is off.

use crate::domain::error::SwingError;
use crate::ports::notifier::Notifier;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<(), SwingError> {
        info!(target: "swingtrader::notify", "{}", message);
        Ok(())
    }
}
