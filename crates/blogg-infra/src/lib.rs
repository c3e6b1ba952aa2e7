//! # Blogg Infrastructure
//!
//! Concrete implementations of the ports defined in `blogg-core`:
//! repositories, token and password services, rate limiting, image hosting
//! and captcha verification.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-memory repositories only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `rate-limit` - Keyed rate limiting via governor
//! - `media` - Cloudinary image uploads
//! - `captcha` - Cloudflare Turnstile verification (requires `auth`)

pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

#[cfg(feature = "media")]
pub mod media;

// Re-exports - In-Memory
pub use database::{DatabaseConnections, InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

#[cfg(all(feature = "auth", feature = "captcha"))]
pub use auth::{TurnstileConfig, TurnstileVerifier};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};

#[cfg(feature = "media")]
pub use media::{CloudinaryConfig, CloudinaryImageHost};
