use chrono::{Duration, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use blogg_core::domain::{Post, PostEdit};
use blogg_core::error::RepoError;
use blogg_core::ports::{BaseRepository, PostRepository};

use crate::database::entity::post;
use crate::database::postgres_repo::PostgresPostRepository;

fn model(author_id: Uuid, title: &str, minutes_ago: i64, is_deleted: bool) -> post::Model {
    let at = Utc::now() - Duration::minutes(minutes_ago);
    post::Model {
        id: Uuid::new_v4(),
        author_id,
        author_name: Some("Ada".to_owned()),
        title: title.to_owned(),
        content: "Content".to_owned(),
        cover_image: "https://img.example/cover.png".to_owned(),
        published: true,
        likes: 0,
        is_deleted,
        created_at: at.into(),
        updated_at: at.into(),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let author = Uuid::new_v4();
    let row = model(author, "Test Post", 0, false);
    let post_id = row.id;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.expect("post should be found");
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author);
}

#[tokio::test]
async fn test_find_page_after_cursor() {
    let author = Uuid::new_v4();
    let anchor = model(author, "anchor", 1, false);
    let older = model(author, "older", 2, false);
    let oldest = model(author, "oldest", 3, false);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![anchor.clone()]])
        .append_query_results([vec![older.clone(), oldest.clone()]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let page = repo.find_page(Some(anchor.id), 2).await.unwrap();

    let ids: Vec<Uuid> = page.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![older.id, oldest.id]);
}

#[tokio::test]
async fn test_find_page_unknown_cursor_is_empty() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let page = repo.find_page(Some(Uuid::new_v4()), 5).await.unwrap();

    assert!(page.is_empty());
}

#[tokio::test]
async fn test_add_likes_reports_rows_touched() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert_eq!(repo.add_likes(Uuid::new_v4(), 1).await.unwrap(), 1);
    assert_eq!(repo.add_likes(Uuid::new_v4(), -1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_content_returns_updated_post() {
    let author = Uuid::new_v4();
    let mut row = model(author, "Edited", 5, false);
    row.likes = 7;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row.clone()]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let post = repo
        .update_content(
            row.id,
            PostEdit {
                title: "Edited".to_owned(),
                content: "Content".to_owned(),
                cover_image: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(post.title, "Edited");
    assert_eq!(post.likes, 7);
}

#[tokio::test]
async fn test_update_content_missing_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let result = repo
        .update_content(
            Uuid::new_v4(),
            PostEdit {
                title: "t".to_owned(),
                content: "c".to_owned(),
                cover_image: None,
            },
        )
        .await;

    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_purge_many_reports_affected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

    assert_eq!(repo.purge_many(Uuid::new_v4(), &ids).await.unwrap(), 2);
}
