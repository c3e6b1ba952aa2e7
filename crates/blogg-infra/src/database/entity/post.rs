//! Post entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub author_id: Uuid,
    #[sea_orm(nullable)]
    pub author_name: Option<String>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub cover_image: String,
    pub published: bool,
    pub likes: i32,
    pub is_deleted: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for blogg_core::domain::Post {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            author_id: model.author_id,
            author_name: model.author_name,
            title: model.title,
            content: model.content,
            cover_image: model.cover_image,
            published: model.published,
            likes: model.likes,
            is_deleted: model.is_deleted,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<blogg_core::domain::Post> for ActiveModel {
    fn from(post: blogg_core::domain::Post) -> Self {
        Self {
            id: Set(post.id),
            author_id: Set(post.author_id),
            author_name: Set(post.author_name),
            title: Set(post.title),
            content: Set(post.content),
            cover_image: Set(post.cover_image),
            published: Set(post.published),
            likes: Set(post.likes),
            is_deleted: Set(post.is_deleted),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
        }
    }
}
