//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod media;
mod rate_limit;
mod repository;

pub use auth::{AuthError, HumanVerifier, PasswordService, TokenClaims, TokenService};
pub use media::{ImageHost, ImageHostError};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{BaseRepository, PostRepository, UserRepository};
