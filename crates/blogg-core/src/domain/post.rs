use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cover image used when a post is created without one.
pub const PLACEHOLDER_COVER_IMAGE: &str = "https://static.vecteezy.com/system/resources/previews/000/578/699/non_2x/vector-feather-pen-write-sign-logo-template-app-icons.jpg";

/// Post entity - a blog post owned by a single author.
///
/// `author_name` is a snapshot taken at creation time and is not kept in
/// sync with later profile renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub title: String,
    pub content: String,
    pub cover_image: String,
    pub published: bool,
    pub likes: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new, published post.
    pub fn new(author_id: Uuid, draft: PostDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            author_name: draft.author_name,
            title: draft.title,
            content: draft.content,
            cover_image: draft
                .cover_image
                .unwrap_or_else(|| PLACEHOLDER_COVER_IMAGE.to_string()),
            published: true,
            likes: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub author_name: Option<String>,
}

/// Input for a full edit. A `None` cover image keeps the current one.
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub title: String,
    pub content: String,
    pub cover_image: Option<String>,
}

/// One page of the public listing.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    /// Id of the last post on this page, or `None` once the listing is exhausted.
    pub next_cursor: Option<Uuid>,
}
