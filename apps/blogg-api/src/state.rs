//! Application state - shared across all handlers.

use std::sync::Arc;

use blogg_core::PostService;
use blogg_core::ports::{
    HumanVerifier, ImageHost, PasswordService, PostRepository, RateLimiter, TokenService,
    UserRepository,
};
use blogg_infra::database::DatabaseConnections;
use blogg_infra::{
    Argon2PasswordService, CloudinaryImageHost, InMemoryPostRepository, InMemoryRateLimiter,
    InMemoryUserRepository, JwtTokenService, TurnstileVerifier,
};

#[cfg(feature = "postgres")]
use blogg_infra::database::{PostgresPostRepository, PostgresUserRepository};

use crate::config::AppConfig;

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database configured but unreachable: {0}")]
    Database(String),
}

/// Shared application state.
///
/// Everything behind an `Arc` so cloning per worker is cheap; the
/// persistence handle is opened once and injected here.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    /// `None` when no image host is configured.
    pub images: Option<Arc<dyn ImageHost>>,
    /// `None` disables the captcha check.
    pub human_check: Option<Arc<dyn HumanVerifier>>,
    pub like_limiter: Arc<dyn RateLimiter>,
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    ///
    /// In-memory repositories are used only when no database is configured.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let (db, posts, users) = open_repositories(config).await?;

        let images = config.cloudinary.clone().map(|c| {
            tracing::info!(cloud = %c.cloud_name, "Cloudinary image host enabled");
            Arc::new(CloudinaryImageHost::new(c)) as Arc<dyn ImageHost>
        });
        let human_check = config
            .turnstile
            .clone()
            .map(|c| Arc::new(TurnstileVerifier::new(c)) as Arc<dyn HumanVerifier>);

        tracing::info!(
            database = db.is_some(),
            images = images.is_some(),
            captcha = human_check.is_some(),
            "Application state initialized"
        );

        Ok(Self {
            posts: Arc::new(PostService::new(posts)),
            users,
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::new()),
            images,
            human_check,
            like_limiter: Arc::new(InMemoryRateLimiter::new(config.like_rate_limit.clone())),
            db,
        })
    }

    /// State backed entirely by in-memory repositories.
    #[cfg(test)]
    pub fn in_memory(config: &AppConfig) -> Self {
        let (db, posts, users) = in_memory_repositories();
        Self {
            posts: Arc::new(PostService::new(posts)),
            users,
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::new()),
            images: None,
            human_check: None,
            like_limiter: Arc::new(InMemoryRateLimiter::new(config.like_rate_limit.clone())),
            db,
        }
    }
}

type Repositories = (
    Option<Arc<DatabaseConnections>>,
    Arc<dyn PostRepository>,
    Arc<dyn UserRepository>,
);

fn in_memory_repositories() -> Repositories {
    (
        None,
        Arc::new(InMemoryPostRepository::new()),
        Arc::new(InMemoryUserRepository::new()),
    )
}

#[cfg(feature = "postgres")]
async fn open_repositories(config: &AppConfig) -> Result<Repositories, StartupError> {
    let Some(db_config) = config.database.as_ref() else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return Ok(in_memory_repositories());
    };

    let connections = DatabaseConnections::init(db_config)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    let conn = Arc::new(connections);
    let posts = Arc::new(PostgresPostRepository::new(conn.main.clone()));
    let users = Arc::new(PostgresUserRepository::new(conn.main.clone()));
    Ok((Some(conn), posts, users))
}

#[cfg(not(feature = "postgres"))]
async fn open_repositories(config: &AppConfig) -> Result<Repositories, StartupError> {
    if config.database.is_some() {
        return Err(StartupError::Database(
            "built without the postgres feature".to_string(),
        ));
    }
    tracing::info!("Running without postgres feature - using in-memory repositories");
    Ok(in_memory_repositories())
}
