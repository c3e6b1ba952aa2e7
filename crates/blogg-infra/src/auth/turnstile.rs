//! Cloudflare Turnstile verification.

use async_trait::async_trait;
use serde::Deserialize;

use blogg_core::ports::{AuthError, HumanVerifier};

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Clone)]
pub struct TurnstileConfig {
    pub secret: String,
    pub endpoint: String,
}

impl TurnstileConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            endpoint: SITEVERIFY_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

pub struct TurnstileVerifier {
    config: TurnstileConfig,
    client: reqwest::Client,
}

impl TurnstileVerifier {
    pub fn new(config: TurnstileConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HumanVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, AuthError> {
        let mut form = vec![
            ("secret", self.config.secret.as_str()),
            ("response", token),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "siteverify returned {}",
                response.status()
            )));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !body.success {
            tracing::info!(errors = ?body.error_codes, "Turnstile token rejected");
        }
        Ok(body.success)
    }
}
