//! # Blogg API Server
//!
//! The main entry point for the Actix-web HTTP server.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use blogg_infra::InMemoryRateLimiter;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::rate_limit::RateLimitMiddleware;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);
    config.log_warnings();

    tracing::info!(
        "Starting Blogg API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await.map_err(|e| {
        tracing::error!(error = %e, "Startup aborted");
        std::io::Error::other(e)
    })?;
    let db = state.db.clone();
    let api_limiter = Arc::new(InMemoryRateLimiter::new(config.api_rate_limit.clone()));

    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(api_limiter.clone()))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(server_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    tracing::info!("HTTP server stopped");

    // Worker copies of the state are gone once the server has stopped.
    drop(state);
    match db.map(Arc::into_inner) {
        Some(Some(db)) => db.close().await,
        Some(None) => tracing::warn!("Database pool still shared at shutdown, not closed"),
        None => {}
    }

    Ok(())
}
