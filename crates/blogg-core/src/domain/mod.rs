//! Domain entities - the core business objects.

mod user;

mod post;

pub use post::{PLACEHOLDER_COVER_IMAGE, Post, PostDraft, PostEdit, PostPage};
pub use user::{ProfileChanges, User};
