//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use blogg_core::domain::{Post, PostEdit, ProfileChanges, User};
use blogg_core::error::RepoError;
use blogg_core::ports::{PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, repo_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// Keep emails out of logs beyond their first character and domain.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.chars().count() > 1 => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.map(Into::into))
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError> {
        let model = user::ActiveModel {
            id: Set(id),
            email: changes.email.map(Set).unwrap_or(NotSet),
            name: changes.name.map(|n| Set(Some(n))).unwrap_or(NotSet),
            profile_image: changes.profile_image.map(|p| Set(Some(p))).unwrap_or(NotSet),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let updated = model.update(&self.db).await.map_err(repo_err)?;
        Ok(updated.into())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), RepoError> {
        let result = UserEntity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Rows owned by `author_id` among `ids` that sit in the trash.
fn trashed_owned(author_id: Uuid, ids: &[Uuid]) -> Condition {
    Condition::all()
        .add(post::Column::AuthorId.eq(author_id))
        .add(post::Column::IsDeleted.eq(true))
        .add(post::Column::Id.is_in(ids.iter().copied()))
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_page(&self, cursor: Option<Uuid>, limit: u64) -> Result<Vec<Post>, RepoError> {
        let mut query = PostEntity::find().filter(post::Column::IsDeleted.eq(false));

        if let Some(cursor_id) = cursor {
            // The cursor row only marks a position; it may since have been trashed.
            let Some(anchor) = PostEntity::find_by_id(cursor_id)
                .one(&self.db)
                .await
                .map_err(repo_err)?
            else {
                tracing::debug!(cursor = %cursor_id, "Unknown cursor, returning empty page");
                return Ok(Vec::new());
            };

            query = query.filter(
                Condition::any()
                    .add(post::Column::CreatedAt.lt(anchor.created_at))
                    .add(
                        Condition::all()
                            .add(post::Column::CreatedAt.eq(anchor.created_at))
                            .add(post::Column::Id.lt(anchor.id)),
                    ),
            );
        }

        let rows = query
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        trashed: bool,
    ) -> Result<Vec<Post>, RepoError> {
        let rows = PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::IsDeleted.eq(trashed))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_content(&self, id: Uuid, edit: PostEdit) -> Result<Post, RepoError> {
        // Only the edited columns are written so concurrent like updates survive.
        let model = post::ActiveModel {
            id: Set(id),
            title: Set(edit.title),
            content: Set(edit.content),
            cover_image: edit.cover_image.map(Set).unwrap_or(NotSet),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let updated = model.update(&self.db).await.map_err(repo_err)?;
        Ok(updated.into())
    }

    async fn set_deleted(&self, id: Uuid, deleted: bool) -> Result<Post, RepoError> {
        let model = post::ActiveModel {
            id: Set(id),
            is_deleted: Set(deleted),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let updated = model.update(&self.db).await.map_err(repo_err)?;
        Ok(updated.into())
    }

    async fn add_likes(&self, id: Uuid, delta: i32) -> Result<u64, RepoError> {
        let result = PostEntity::update_many()
            .col_expr(
                post::Column::Likes,
                Expr::col(post::Column::Likes).add(delta),
            )
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::IsDeleted.eq(false))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected)
    }

    async fn restore_many(&self, author_id: Uuid, ids: &[Uuid]) -> Result<u64, RepoError> {
        let result = PostEntity::update_many()
            .col_expr(post::Column::IsDeleted, Expr::value(false))
            .col_expr(post::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(trashed_owned(author_id, ids))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected)
    }

    async fn purge_many(&self, author_id: Uuid, ids: &[Uuid]) -> Result<u64, RepoError> {
        let result = PostEntity::delete_many()
            .filter(trashed_owned(author_id, ids))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected)
    }
}
