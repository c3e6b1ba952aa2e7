//! Post lifecycle and listing.
//!
//! `PostService` owns every state transition of a [`Post`]:
//! create, edit, like, soft delete, restore and permanent delete.
//! Visibility rules:
//!
//! - live posts (`is_deleted = false`) are the only ones returned by
//!   listings, `get_by_id`, `update` and `set_like`;
//! - trashed posts are the only ones `restore` and `permanent_delete` act on;
//! - `soft_delete` accepts both so that repeating it is a no-op.
//!
//! Only the author may mutate a post. Likes are the exception: any
//! authenticated caller may add or remove one.

use std::fmt::Display;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Post, PostDraft, PostEdit, PostPage};
use crate::error::{DomainError, RepoError};
use crate::ports::PostRepository;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Larger requested page sizes are clamped to this.
pub const MAX_PAGE_SIZE: u64 = 50;

/// Resolve a requested page size.
pub fn page_size(requested: Option<u64>) -> Result<u64, DomainError> {
    match requested {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(0) => Err(DomainError::Validation(
            "limit must be at least 1".to_string(),
        )),
        Some(n) => Ok(n.min(MAX_PAGE_SIZE)),
    }
}

fn require_text(title: &str, content: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(DomainError::Validation(
            "Title and content are required".to_string(),
        ));
    }
    Ok(())
}

/// Log a repository failure with its context and hide the details.
fn internal(operation: &'static str, resource: impl Display, err: RepoError) -> DomainError {
    tracing::error!(
        operation,
        resource_id = %resource,
        error = %err,
        "Post repository failure"
    );
    DomainError::Internal(format!("{operation} failed"))
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    pub async fn create(&self, author_id: Uuid, draft: PostDraft) -> Result<Post, DomainError> {
        require_text(&draft.title, &draft.content)?;

        let post = Post::new(author_id, draft);
        let id = post.id;
        let saved = self
            .posts
            .insert(post)
            .await
            .map_err(|e| internal("create_post", id, e))?;

        tracing::info!(post_id = %saved.id, author_id = %author_id, "Post created");
        Ok(saved)
    }

    pub async fn update(
        &self,
        requester: Uuid,
        post_id: Uuid,
        edit: PostEdit,
    ) -> Result<Post, DomainError> {
        require_text(&edit.title, &edit.content)?;

        let post = self.find("update_post", post_id).await?;
        if post.is_deleted {
            return Err(DomainError::post_not_found(post_id));
        }
        Self::ensure_owner(&post, requester)?;

        self.posts
            .update_content(post_id, edit)
            .await
            .map_err(|e| Self::gone_or_internal("update_post", post_id, e))
    }

    /// Add (`increment = true`) or remove one like. No floor is applied.
    pub async fn set_like(&self, post_id: Uuid, increment: bool) -> Result<(), DomainError> {
        let delta = if increment { 1 } else { -1 };
        let touched = self
            .posts
            .add_likes(post_id, delta)
            .await
            .map_err(|e| internal("set_like", post_id, e))?;

        if touched == 0 {
            return Err(DomainError::post_not_found(post_id));
        }
        Ok(())
    }

    /// Move a post to the trash. Trashing an already trashed post succeeds.
    pub async fn soft_delete(&self, requester: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let post = self.find("soft_delete", post_id).await?;
        Self::ensure_owner(&post, requester)?;

        if post.is_deleted {
            tracing::debug!(post_id = %post_id, "Post already in trash");
            return Ok(());
        }

        self.posts
            .set_deleted(post_id, true)
            .await
            .map_err(|e| Self::gone_or_internal("soft_delete", post_id, e))?;
        Ok(())
    }

    pub async fn restore(&self, requester: Uuid, post_id: Uuid) -> Result<Post, DomainError> {
        let post = self.find_trashed("restore", post_id).await?;
        Self::ensure_owner(&post, requester)?;

        self.posts
            .set_deleted(post_id, false)
            .await
            .map_err(|e| Self::gone_or_internal("restore", post_id, e))
    }

    /// Restore every trashed post of `requester` among `ids`.
    /// Returns how many were actually restored; other ids are skipped.
    pub async fn bulk_restore(&self, requester: Uuid, ids: &[Uuid]) -> Result<u64, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let affected = self
            .posts
            .restore_many(requester, ids)
            .await
            .map_err(|e| internal("bulk_restore", requester, e))?;

        tracing::info!(
            requester = %requester,
            requested = ids.len(),
            affected,
            "Bulk restore applied"
        );
        Ok(affected)
    }

    pub async fn permanent_delete(&self, requester: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let post = self.find_trashed("permanent_delete", post_id).await?;
        Self::ensure_owner(&post, requester)?;

        self.posts
            .delete(post_id)
            .await
            .map_err(|e| Self::gone_or_internal("permanent_delete", post_id, e))?;

        tracing::info!(post_id = %post_id, "Post permanently deleted");
        Ok(())
    }

    /// Same filtering rules as [`PostService::bulk_restore`].
    pub async fn bulk_permanent_delete(
        &self,
        requester: Uuid,
        ids: &[Uuid],
    ) -> Result<u64, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let affected = self
            .posts
            .purge_many(requester, ids)
            .await
            .map_err(|e| internal("bulk_permanent_delete", requester, e))?;

        tracing::info!(
            requester = %requester,
            requested = ids.len(),
            affected,
            "Bulk permanent delete applied"
        );
        Ok(affected)
    }

    /// One page of live posts, newest first.
    ///
    /// `next_cursor` is set only when the page came back full; feed it into
    /// the next call to continue. A short page ends the listing.
    pub async fn list_public(
        &self,
        cursor: Option<Uuid>,
        limit: Option<u64>,
    ) -> Result<PostPage, DomainError> {
        let limit = page_size(limit)?;
        let posts = self
            .posts
            .find_page(cursor, limit)
            .await
            .map_err(|e| {
                let resource = cursor.map(|c| c.to_string()).unwrap_or_default();
                internal("list_public", resource, e)
            })?;

        let next_cursor = if posts.len() as u64 == limit {
            posts.last().map(|p| p.id)
        } else {
            None
        };

        Ok(PostPage { posts, next_cursor })
    }

    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, DomainError> {
        self.posts
            .find_by_author(author_id, false)
            .await
            .map_err(|e| internal("list_by_author", author_id, e))
    }

    pub async fn list_trash_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, DomainError> {
        self.posts
            .find_by_author(author_id, true)
            .await
            .map_err(|e| internal("list_trash_by_author", author_id, e))
    }

    pub async fn get_by_id(&self, post_id: Uuid) -> Result<Post, DomainError> {
        let post = self.find("get_post", post_id).await?;
        if post.is_deleted {
            return Err(DomainError::post_not_found(post_id));
        }
        Ok(post)
    }

    async fn find(&self, operation: &'static str, post_id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await
            .map_err(|e| internal(operation, post_id, e))?
            .ok_or_else(|| DomainError::post_not_found(post_id))
    }

    async fn find_trashed(
        &self,
        operation: &'static str,
        post_id: Uuid,
    ) -> Result<Post, DomainError> {
        let post = self.find(operation, post_id).await?;
        if !post.is_deleted {
            return Err(DomainError::post_not_found(post_id));
        }
        Ok(post)
    }

    fn ensure_owner(post: &Post, requester: Uuid) -> Result<(), DomainError> {
        if !post.is_owned_by(requester) {
            tracing::warn!(
                post_id = %post.id,
                requester = %requester,
                "Rejected mutation by non-author"
            );
            return Err(DomainError::Forbidden(
                "Only the author can modify this post".to_string(),
            ));
        }
        Ok(())
    }

    // The row can vanish between the lookup and the write.
    fn gone_or_internal(operation: &'static str, post_id: Uuid, err: RepoError) -> DomainError {
        match err {
            RepoError::NotFound => DomainError::post_not_found(post_id),
            other => internal(operation, post_id, other),
        }
    }
}
