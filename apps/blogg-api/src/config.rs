//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use blogg_infra::auth::{DEFAULT_JWT_SECRET, JwtConfig};
use blogg_infra::database::DatabaseConfig;
use blogg_infra::{CloudinaryConfig, RateLimitConfig, TurnstileConfig};

use crate::telemetry::TelemetryConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    /// Set only when all three Cloudinary variables are present.
    pub cloudinary: Option<CloudinaryConfig>,
    /// Signup/signin require a captcha token when set.
    pub turnstile: Option<TurnstileConfig>,
    /// Per client IP, across the whole API.
    pub api_rate_limit: RateLimitConfig,
    /// Per user, on the like endpoint.
    pub like_rate_limit: RateLimitConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse_or = |key: &str, default| parse_or(get(key), default);

        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            max_connections: parse_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_or("DB_MIN_CONNECTIONS", 2),
            ..DatabaseConfig::new(url)
        });

        let jwt = JwtConfig {
            secret: get("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            expiration_hours: parse_or("JWT_EXPIRATION_HOURS", 24) as i64,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "blogg-api".to_string()),
        };

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_UPLOAD_PRESET"),
        ) {
            (Some(cloud), Some(key), Some(preset)) => {
                Some(CloudinaryConfig::new(cloud, key, preset))
            }
            _ => None,
        };

        let production = get("RUST_ENV")
            .map(|v| v == "production" || v == "prod")
            .unwrap_or(false);

        Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: self::parse_or::<u16>(get("PORT"), 8080),
            production,
            database,
            jwt,
            cloudinary,
            turnstile: get("TURNSTILE_SECRET").map(TurnstileConfig::new),
            api_rate_limit: RateLimitConfig {
                max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 100),
                window: Duration::from_secs(parse_or("RATE_LIMIT_WINDOW_SECS", 60).into()),
            },
            like_rate_limit: RateLimitConfig {
                max_requests: parse_or("LIKE_LIMIT_MAX", 30),
                window: Duration::from_secs(parse_or("LIKE_LIMIT_WINDOW_SECS", 60).into()),
            },
            telemetry: TelemetryConfig {
                json_logs: get("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
                service_name: get("SERVICE_NAME").unwrap_or_else(|| "blogg-api".to_string()),
                alerts_enabled: get("ALERTS_ENABLED")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
                alert_webhook_url: get("ALERT_WEBHOOK_URL"),
            },
        }
    }

    /// Warn about settings that are fine locally but not in production.
    pub fn log_warnings(&self) {
        if self.jwt.secret == DEFAULT_JWT_SECRET {
            if self.production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }
        if self.cloudinary.is_none() {
            tracing::info!("Cloudinary not configured; uploaded cover images are ignored");
        }
        if self.turnstile.is_none() {
            tracing::info!("TURNSTILE_SECRET not set; captcha checks disabled");
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.database.is_none());
        assert!(config.cloudinary.is_none());
        assert!(config.turnstile.is_none());
        assert_eq!(config.jwt.secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.jwt.expiration_hours, 24);
        assert_eq!(config.like_rate_limit.max_requests, 30);
        assert!(!config.telemetry.json_logs);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/blogg"),
            ("DB_MAX_CONNECTIONS", "5"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRATION_HOURS", "2"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_UPLOAD_PRESET", "preset"),
            ("TURNSTILE_SECRET", "captcha"),
            ("LOG_FORMAT", "JSON"),
            ("RUST_ENV", "production"),
        ]);

        assert_eq!(config.port, 9000);
        let db = config.database.expect("database configured");
        assert_eq!(db.url, "postgres://localhost/blogg");
        assert_eq!(db.max_connections, 5);
        assert_eq!(config.jwt.secret, "s3cret");
        assert_eq!(config.jwt.expiration_hours, 2);
        assert_eq!(config.cloudinary.expect("cloudinary").cloud_name, "demo");
        assert_eq!(config.turnstile.expect("turnstile").secret, "captcha");
        assert!(config.telemetry.json_logs);
        assert!(config.production);
    }

    #[test]
    fn partial_cloudinary_is_ignored_and_bad_numbers_fall_back() {
        let config = load(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("PORT", "not-a-port"),
            ("DATABASE_URL", "  "),
        ]);

        assert!(config.cloudinary.is_none());
        assert_eq!(config.port, 8080);
        assert!(config.database.is_none());
    }

    #[test]
    fn out_of_range_port_falls_back_instead_of_wrapping() {
        assert_eq!(load(&[("PORT", "70000")]).port, 8080);
        assert_eq!(load(&[("PORT", "65535")]).port, 65535);
    }
}
