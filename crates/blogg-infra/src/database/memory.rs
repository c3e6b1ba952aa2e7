//! In-memory repositories - used when no database is configured and in tests.
//!
//! Data is lost on process restart. Each write takes the store's write lock
//! once, so like arithmetic is as atomic here as the SQL `likes = likes + n`.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use blogg_core::domain::{Post, PostEdit, ProfileChanges, User};
use blogg_core::error::RepoError;
use blogg_core::ports::{BaseRepository, PostRepository, UserRepository};

/// Newest first, ties broken by id.
fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by_key(|p| Reverse((p.created_at, p.id)));
}

#[derive(Default)]
pub struct InMemoryPostRepository {
    rows: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, entity: Post) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entity.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_page(&self, cursor: Option<Uuid>, limit: u64) -> Result<Vec<Post>, RepoError> {
        let rows = self.rows.read().await;

        let anchor = match cursor {
            Some(id) => match rows.get(&id) {
                Some(post) => Some((post.created_at, post.id)),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut live: Vec<Post> = rows
            .values()
            .filter(|p| !p.is_deleted)
            .filter(|p| anchor.is_none_or(|key| (p.created_at, p.id) < key))
            .cloned()
            .collect();
        sort_newest_first(&mut live);
        live.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(live)
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        trashed: bool,
    ) -> Result<Vec<Post>, RepoError> {
        let mut posts: Vec<Post> = self
            .rows
            .read()
            .await
            .values()
            .filter(|p| p.author_id == author_id && p.is_deleted == trashed)
            .cloned()
            .collect();
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn update_content(&self, id: Uuid, edit: PostEdit) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        let post = rows.get_mut(&id).ok_or(RepoError::NotFound)?;

        post.title = edit.title;
        post.content = edit.content;
        if let Some(cover) = edit.cover_image {
            post.cover_image = cover;
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn set_deleted(&self, id: Uuid, deleted: bool) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        let post = rows.get_mut(&id).ok_or(RepoError::NotFound)?;

        post.is_deleted = deleted;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn add_likes(&self, id: Uuid, delta: i32) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(post) if !post.is_deleted => {
                post.likes = post
                    .likes
                    .checked_add(delta)
                    .ok_or_else(|| RepoError::Query("likes out of range for integer".into()))?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn restore_many(&self, author_id: Uuid, ids: &[Uuid]) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        let now = Utc::now();
        let mut affected = 0;

        for id in ids {
            if let Some(post) = rows.get_mut(id) {
                if post.author_id == author_id && post.is_deleted {
                    post.is_deleted = false;
                    post.updated_at = now;
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn purge_many(&self, author_id: Uuid, ids: &[Uuid]) -> Result<u64, RepoError> {
        let mut rows = self.rows.write().await;
        let mut affected = 0;

        for id in ids {
            let matches = rows
                .get(id)
                .is_some_and(|p| p.author_id == author_id && p.is_deleted);
            if matches {
                rows.remove(id);
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, entity: User) -> Result<User, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|u| u.email == entity.email) || rows.contains_key(&entity.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError> {
        let mut rows = self.rows.write().await;

        if let Some(email) = &changes.email {
            if rows.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Constraint("Email already in use".to_string()));
            }
        }

        let user = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(name) = changes.name {
            user.name = Some(name);
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(image) = changes.profile_image {
            user.profile_image = Some(image);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError> {
        let mut rows = self.rows.write().await;
        let user = rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        Ok(())
    }
}
