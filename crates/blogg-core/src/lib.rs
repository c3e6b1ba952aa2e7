//! # Blogg Core
//!
//! The domain layer of the Blogg backend.
//! Entities, the error taxonomy, port traits, and the post lifecycle service.
//! Nothing here talks to a database or the network directly.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use error::DomainError;
pub use service::PostService;
