use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Post, PostEdit, ProfileChanges, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Apply the non-empty fields of `changes`.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError>;

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError>;
}

/// Post repository.
///
/// `find_by_id` returns rows in either state; visibility is decided by the
/// caller. Every other query applies the `is_deleted` filter it names.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Non-deleted posts ordered by `created_at` then `id`, both descending,
    /// starting strictly after `cursor` when one is given.
    async fn find_page(&self, cursor: Option<Uuid>, limit: u64) -> Result<Vec<Post>, RepoError>;

    /// All posts of an author in the given trash state, newest first.
    async fn find_by_author(&self, author_id: Uuid, trashed: bool)
    -> Result<Vec<Post>, RepoError>;

    /// Overwrite title, content and (when given) cover image.
    async fn update_content(&self, id: Uuid, edit: PostEdit) -> Result<Post, RepoError>;

    async fn set_deleted(&self, id: Uuid, deleted: bool) -> Result<Post, RepoError>;

    /// Atomically add `delta` to the like counter of a non-deleted post.
    /// Returns the number of rows touched.
    async fn add_likes(&self, id: Uuid, delta: i32) -> Result<u64, RepoError>;

    /// Restore the trashed posts among `ids` owned by `author_id`.
    async fn restore_many(&self, author_id: Uuid, ids: &[Uuid]) -> Result<u64, RepoError>;

    /// Permanently remove the trashed posts among `ids` owned by `author_id`.
    async fn purge_many(&self, author_id: Uuid, ids: &[Uuid]) -> Result<u64, RepoError>;
}
