//! Authentication implementations.

mod jwt;
mod password;

#[cfg(feature = "captcha")]
mod turnstile;

pub use jwt::{DEFAULT_JWT_SECRET, JwtConfig, JwtTokenService};
pub use password::Argon2PasswordService;

#[cfg(feature = "captcha")]
pub use turnstile::{TurnstileConfig, TurnstileVerifier};
