//! Critical error alerting layer for tracing.
//!
//! ERROR events (repository failures, database outages, captcha provider
//! errors) are copied to an alert channel and delivered off the request
//! path by a background task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

/// Alert message containing error details.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub service: String,
    pub level: String,
    pub message: String,
    pub target: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub fields: Vec<(String, String)>,
}

impl AlertMessage {
    /// One-line summary of the structured fields, e.g. `operation=update_post resource_id=...`.
    pub fn field_summary(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trait for alert senders - implement this for different backends.
#[async_trait::async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, alert: AlertMessage) -> Result<(), AlertError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Failed to send alert: {0}")]
    SendError(String),
}

/// Writes alerts to stderr (for development).
pub struct ConsoleAlertSender;

#[async_trait::async_trait]
impl AlertSender for ConsoleAlertSender {
    async fn send(&self, alert: AlertMessage) -> Result<(), AlertError> {
        eprintln!(
            "\n[ALERT] {} {}\n  target: {}\n  message: {}\n  fields: {}\n  time: {}\n",
            alert.service,
            alert.level,
            alert.target,
            alert.message,
            alert.field_summary(),
            alert.timestamp
        );
        Ok(())
    }
}

/// Posts alerts to a Slack/Discord style webhook.
pub struct WebhookAlertSender {
    url: String,
    client: reqwest::Client,
}

impl WebhookAlertSender {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

fn webhook_payload(alert: &AlertMessage) -> serde_json::Value {
    serde_json::json!({
        "text": format!(
            "*{}* {}\n*Target:* {}\n*Message:* {}\n*Fields:* {}\n*Time:* {}",
            alert.service,
            alert.level,
            alert.target,
            alert.message,
            alert.field_summary(),
            alert.timestamp
        )
    })
}

#[async_trait::async_trait]
impl AlertSender for WebhookAlertSender {
    async fn send(&self, alert: AlertMessage) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.url)
            .json(&webhook_payload(&alert))
            .send()
            .await
            .map_err(|e| AlertError::SendError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AlertError::SendError(format!(
                "webhook answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Tracing layer that forwards ERROR events to an [`AlertSender`].
pub struct AlertLayer {
    service: String,
    sender: mpsc::Sender<AlertMessage>,
}

impl AlertLayer {
    const BUFFER: usize = 100;

    /// Must be called from within a tokio runtime.
    pub fn new(service: impl Into<String>, alert_sender: Arc<dyn AlertSender>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertMessage>(Self::BUFFER);

        tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                // Not through tracing; that would feed back into this layer.
                if let Err(e) = alert_sender.send(alert).await {
                    eprintln!("Failed to send alert: {}", e);
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
        Self::new(service, Arc::new(WebhookAlertSender::new(url)))
    }

    fn build_alert(&self, event: &Event<'_>) -> AlertMessage {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        AlertMessage {
            service: self.service.clone(),
            level: event.metadata().level().to_string(),
            message: visitor.message,
            target: event.metadata().target().to_string(),
            timestamp: chrono::Utc::now(),
            fields: visitor.fields,
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
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

        // Drop rather than block when the channel is full.
        let _ = self.sender.try_send(self.build_alert(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<AlertMessage>>);

    #[async_trait::async_trait]
    impl AlertSender for Recorder {
        async fn send(&self, alert: AlertMessage) -> Result<(), AlertError> {
            self.0.lock().await.push(alert);
            Ok(())
        }
    }

    #[tokio::test]
    async fn forwards_only_errors_with_fields() {
        let recorder = Arc::new(Recorder::default());
        let layer = AlertLayer::new("blogg-test", recorder.clone());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("not an alert");
            tracing::error!(operation = "update_post", "Post repository failure");
        });

        for _ in 0..50 {
            if !recorder.0.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let alerts = recorder.0.lock().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].service, "blogg-test");
        assert_eq!(alerts[0].message, "Post repository failure");
        assert_eq!(alerts[0].field_summary(), "operation=update_post");
    }

    #[test]
    fn webhook_payload_mentions_service_and_fields() {
        let alert = AlertMessage {
            service: "blogg-api".to_string(),
            level: "ERROR".to_string(),
            message: "boom".to_string(),
            target: "blogg_core::service".to_string(),
            timestamp: chrono::Utc::now(),
            fields: vec![("resource_id".to_string(), "42".to_string())],
        };

        let text = webhook_payload(&alert)["text"].as_str().unwrap().to_string();
        assert!(text.contains("blogg-api"));
        assert!(text.contains("resource_id=42"));
    }
}
