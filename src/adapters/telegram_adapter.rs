//! Telegram Bot API notifier.

use crate::domain::config_validation::{TelegramConfig, TelegramRecipient};
use crate::domain::error::SwingError;
use crate::ports::notifier::Notifier;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_base: String,
    recipients: Vec<TelegramRecipient>,
    prefix: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, SwingError> {
        Self::with_api_base(config, timeout, DEFAULT_API_BASE)
    }

    pub fn with_api_base(
        config: &TelegramConfig,
        timeout: Duration,
        api_base: &str,
    ) -> Result<Self, SwingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e: reqwest::Error| SwingError::Notification {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            recipients: config.recipients.clone(),
            prefix: config.prefix.clone(),
        })
    }

    fn endpoint(&self, bot_token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, bot_token)
    }

    fn text(&self, message: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}\n{}", prefix, message),
            None => message.to_string(),
        }
    }
}

impl Notifier for TelegramNotifier {
    /// Sends to every recipient; the first failure is returned after all
    /// recipients have been tried.
    fn notify(&self, message: &str) -> Result<(), SwingError> {
        let text = self.text(message);
        let mut first_error = None;

        for TelegramRecipient { bot_token, chat_id } in &self.recipients {
            let result = self
                .client
                .post(self.endpoint(bot_token))
                .json(&SendMessage {
                    chat_id,
                    text: &text,
                })
                .send()
                .and_then(|r| r.error_for_status());

            match result {
                Ok(_) => debug!(chat_id = chat_id.as_str(), "telegram message sent"),
                Err(e) => {
                    // the token is part of the URL; keep it out of logs
                    let reason = e.without_url().to_string();
                    warn!(chat_id = chat_id.as_str(), error = %reason, "telegram send failed");
                    if first_error.is_none() {
                        first_error = Some(SwingError::Notification { reason });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
