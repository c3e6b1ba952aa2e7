//! Telemetry initialization - tracing and alerting setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::observability::AlertLayer;

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Enable JSON logging (for production).
    pub json_logs: bool,
    /// Service name attached to alerts.
    pub service_name: String,
    /// Enable critical error alerting.
    pub alerts_enabled: bool,
    /// Webhook URL for alerts (Slack, Discord, etc.).
    pub alert_webhook_url: Option<String>,
}

/// Initialize telemetry (tracing and alerting).
///
/// Must run inside the tokio runtime; the alert layer spawns its sender task.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blogg_api=debug,blogg_core=debug,blogg_infra=debug"));

    // Create alert layer if enabled
    let alert_layer = if config.alerts_enabled {
        let service = config.service_name.clone();
        let layer = match &config.alert_webhook_url {
            Some(url) => AlertLayer::webhook(service, url.clone()),
            None => AlertLayer::console(service),
        };
        Some(layer)
    } else {
        None
    };

    // Build and init subscriber based on log format
    if config.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(alert_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .with(alert_layer)
            .init();
    }

    tracing::info!(
        service = %config.service_name,
        alert_webhook = config.alert_webhook_url.is_some(),
        json_logs = config.json_logs,
        alerts_enabled = config.alerts_enabled,
        "Telemetry initialized"
    );
}
