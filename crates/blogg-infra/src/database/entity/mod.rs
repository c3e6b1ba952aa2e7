//! SeaORM entities backing the repositories.

pub mod post;
pub mod user;
