//! Operator alerting layer for tracing.
//!
//! ERROR-level events (a queued Discord request panicking, the bot token being
//! rejected, a failed cache sweep) are forwarded to a Discord webhook, or to
//! stderr during development.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

/// Discord caps message content at 2000 characters.
const MAX_CONTENT_LEN: usize = 1900;

/// Alert built from one ERROR event.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    /// Service that raised the alert.
    pub service: String,
    pub message: String,
    pub target: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub fields: Vec<(String, String)>,
}

impl AlertMessage {
    /// Markdown body for a Discord message.
    fn to_discord_content(&self) -> String {
        let mut content = format!(
            "**{} error** `{}`\n{}\n",
            self.service, self.target, self.message
        );
        for (name, value) in &self.fields {
            content.push_str(&format!("- {name}: `{value}`\n"));
        }
        content.push_str(&format!("<t:{}:f>", self.timestamp.timestamp()));

        if content.len() > MAX_CONTENT_LEN {
            let mut cut = MAX_CONTENT_LEN;
            while !content.is_char_boundary(cut) {
                cut -= 1;
            }
            content.truncate(cut);
            content.push('…');
        }
        content
    }
}

/// Destination for alerts.
#[async_trait::async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, alert: AlertMessage) -> Result<(), AlertError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Failed to send alert: {0}")]
    SendError(String),
}

/// Writes alerts to stderr. Cannot log through tracing without re-entering this layer.
pub struct ConsoleAlertSender;

#[async_trait::async_trait]
impl AlertSender for ConsoleAlertSender {
    async fn send(&self, alert: AlertMessage) -> Result<(), AlertError> {
        eprintln!(
            "[ALERT {}] {} {}: {}",
            alert.timestamp.to_rfc3339(),
            alert.service,
            alert.target,
            alert.message
        );
        Ok(())
    }
}

/// Posts alerts to a Discord channel webhook.
pub struct DiscordWebhookSender {
    url: String,
    client: reqwest::Client,
}

impl DiscordWebhookSender {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl AlertSender for DiscordWebhookSender {
    async fn send(&self, alert: AlertMessage) -> Result<(), AlertError> {
        let payload = serde_json::json!({
            "username": "Vaultcord",
            "content": alert.to_discord_content(),
            "allowed_mentions": { "parse": [] },
        });

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AlertError::SendError(e.to_string()))?;

        Ok(())
    }
}

/// Tracing layer that forwards ERROR events to an [`AlertSender`].
pub struct AlertLayer {
    service: String,
    sender: mpsc::Sender<AlertMessage>,
}

impl AlertLayer {
    pub fn new(service: impl Into<String>, alert_sender: Arc<dyn AlertSender>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertMessage>(100);

        tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                if let Err(e) = alert_sender.send(alert).await {
                    eprintln!("{e}");
                }
            }
        });

        Self {
            service: service.into(),
            sender: tx,
        }
    }

    pub fn console(service: impl Into<String>) -> Self {
        Self::new(service, Arc::new(ConsoleAlertSender))
    }

    pub fn webhook(service: impl Into<String>, url: String) -> Self {
        Self::new(service, Arc::new(DiscordWebhookSender::new(url)))
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != tracing::Level::ERROR {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let alert = AlertMessage {
            service: self.service.clone(),
            message: visitor.message,
            target: event.metadata().target().to_string(),
            timestamp: chrono::Utc::now(),
            fields: visitor.fields,
        };

        // Dropped when the channel is full
        let _ = self.sender.try_send(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alert(message: &str) -> AlertMessage {
        AlertMessage {
            service: "vaultcord-api".to_string(),
            message: message.to_string(),
            target: "vaultcord_infra::rate_limit::queue".to_string(),
            timestamp: chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            fields: vec![("endpoint".to_string(), "guilds/42".to_string())],
        }
    }

    #[test]
    fn test_discord_content_format() {
        let content = alert("Queued request panicked").to_discord_content();
        assert!(content.starts_with("**vaultcord-api error** `vaultcord_infra::rate_limit::queue`"));
        assert!(content.contains("- endpoint: `guilds/42`"));
        assert!(content.ends_with("<t:1700000000:f>"));
    }

    #[test]
    fn test_discord_content_is_truncated() {
        let content = alert(&"é".repeat(3_000)).to_discord_content();
        assert!(content.len() <= MAX_CONTENT_LEN + '…'.len_utf8());
        assert!(content.ends_with('…'));
    }
}
