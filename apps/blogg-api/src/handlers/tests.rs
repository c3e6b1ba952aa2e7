use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};
use uuid::Uuid;

use blogg_core::domain::{PLACEHOLDER_COVER_IMAGE, Post, PostDraft};

use super::configure_routes;
use crate::config::AppConfig;
use crate::state::AppState;

fn state_with(pairs: &[(&str, &str)]) -> AppState {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = AppConfig::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    });
    AppState::in_memory(&config)
}

fn state() -> AppState {
    state_with(&[])
}

fn bearer(state: &AppState, user_id: Uuid) -> (&'static str, String) {
    let token = state
        .tokens
        .generate_token(user_id, "writer@example.com")
        .unwrap();
    ("Authorization", format!("Bearer {token}"))
}

async fn seed(state: &AppState, author: Uuid, title: &str) -> Post {
    state
        .posts
        .create(
            author,
            PostDraft {
                title: title.to_string(),
                content: "body".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

const BOUNDARY: &str = "blogg-test-boundary";

/// Build a `multipart/form-data` body. A `Some` filename makes a file part.
fn multipart(parts: &[(&str, Option<&str>, &str)]) -> (String, Vec<u8>) {
    let mut body = String::new();
    for (name, filename, value) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(file) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    (
        format!("multipart/form-data; boundary={BOUNDARY}"),
        body.into_bytes(),
    )
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_rt::test]
async fn health_reports_in_memory_store() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "in-memory");
}

#[actix_rt::test]
async fn blog_routes_require_a_token() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::get().uri("/api/v1/blog/bulk").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/blog/bulk")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn create_from_multipart_uses_placeholder_without_cover() {
    let state = state();
    let app = app!(state);
    let author = Uuid::new_v4();

    let (content_type, payload) = multipart(&[
        ("title", None, "Hello"),
        ("content", None, "First post"),
        ("authorName", None, "Ada"),
        ("coverImage", Some("cover.png"), "\u{89}PNG fake bytes"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/v1/blog")
        .insert_header(bearer(&state, author))
        .insert_header(("Content-Type", content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["title"], "Hello");
    assert_eq!(body["data"]["authorName"], "Ada");
    assert_eq!(body["data"]["likes"], 0);
    assert_eq!(body["data"]["coverImage"], PLACEHOLDER_COVER_IMAGE);
    assert_eq!(body["data"]["authorId"], author.to_string());
}

#[actix_rt::test]
async fn create_keeps_a_cover_url_field() {
    let state = state();
    let app = app!(state);

    let (content_type, payload) = multipart(&[
        ("title", None, "Hello"),
        ("content", None, "First post"),
        ("coverImage", None, "https://img.example.com/a.png"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/v1/blog")
        .insert_header(bearer(&state, Uuid::new_v4()))
        .insert_header(("Content-Type", content_type))
        .set_payload(payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["coverImage"], "https://img.example.com/a.png");
}

#[actix_rt::test]
async fn create_without_title_is_bad_request() {
    let state = state();
    let app = app!(state);

    let (content_type, payload) = multipart(&[("content", None, "no title")]);
    let req = test::TestRequest::post()
        .uri("/api/v1/blog")
        .insert_header(bearer(&state, Uuid::new_v4()))
        .insert_header(("Content-Type", content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 400);
}

#[actix_rt::test]
async fn zero_limit_is_bad_request() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/blog/bulk?limit=0")
        .insert_header(bearer(&state, Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn public_listing_pages_with_cursor() {
    let state = state();
    let app = app!(state);
    let author = Uuid::new_v4();
    for title in ["a", "b", "c"] {
        seed(&state, author, title).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/blog/bulk?limit=2")
        .insert_header(bearer(&state, author))
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    let posts = first["data"]["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    let cursor = first["data"]["nextCursor"].as_str().unwrap().to_string();
    assert_eq!(posts[1]["id"], cursor.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/blog/bulk?limit=2&cursor={cursor}"))
        .insert_header(bearer(&state, author))
        .to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(second["data"]["posts"].as_array().unwrap().len(), 1);
    assert!(second["data"]["nextCursor"].is_null());
}

#[actix_rt::test]
async fn non_author_update_is_forbidden() {
    let state = state();
    let app = app!(state);
    let post = seed(&state, Uuid::new_v4(), "mine").await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/blog/{}", post.id))
        .insert_header(bearer(&state, Uuid::new_v4()))
        .set_json(json!({ "title": "stolen", "content": "stolen" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn trashed_post_is_not_found_until_restored() {
    let state = state();
    let app = app!(state);
    let author = Uuid::new_v4();
    let post = seed(&state, author, "soon gone").await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/blog/{}", post.id))
        .insert_header(bearer(&state, author))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/blog/{}", post.id))
        .insert_header(bearer(&state, author))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/blog/restore/{}", post.id))
        .insert_header(bearer(&state, author))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/blog/{}", post.id))
        .insert_header(bearer(&state, author))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn bulk_restore_reports_affected_count() {
    let state = state();
    let app = app!(state);
    let author = Uuid::new_v4();
    let trashed = seed(&state, author, "trashed").await;
    let live = seed(&state, author, "live").await;
    let foreign = seed(&state, Uuid::new_v4(), "foreign").await;
    state.posts.soft_delete(author, trashed.id).await.unwrap();
    state
        .posts
        .soft_delete(foreign.author_id, foreign.id)
        .await
        .unwrap();

    let req = test::TestRequest::put()
        .uri("/api/v1/blog/restore/bulk")
        .insert_header(bearer(&state, author))
        .set_json(json!({ "ids": [trashed.id, live.id, foreign.id, Uuid::new_v4()] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["affected"], 1);
}

#[actix_rt::test]
async fn permanent_delete_of_live_post_is_not_found() {
    let state = state();
    let app = app!(state);
    let author = Uuid::new_v4();
    let post = seed(&state, author, "live").await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/blog/permanent/{}", post.id))
        .insert_header(bearer(&state, author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn likes_are_rate_limited_per_user() {
    let state = state_with(&[("LIKE_LIMIT_MAX", "1")]);
    let app = app!(state);
    let post = seed(&state, Uuid::new_v4(), "popular").await;
    let fan = Uuid::new_v4();

    let like = |user: Uuid| {
        test::TestRequest::put()
            .uri(&format!("/api/v1/blog/like/{}", post.id))
            .insert_header(bearer(&state, user))
            .set_json(json!({ "increment": true }))
            .to_request()
    };

    assert_eq!(test::call_service(&app, like(fan)).await.status(), StatusCode::OK);

    let resp = test::call_service(&app, like(fan)).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("Retry-After"));

    assert_eq!(
        test::call_service(&app, like(Uuid::new_v4())).await.status(),
        StatusCode::OK
    );
    assert_eq!(state.posts.get_by_id(post.id).await.unwrap().likes, 2);
}

#[actix_rt::test]
async fn malformed_json_is_problem_details() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri("/api/v1/blog/restore/bulk")
        .insert_header(bearer(&state, Uuid::new_v4()))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Bad Request");
}

#[actix_rt::test]
async fn signup_signin_and_password_change() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/user/signup")
        .set_json(json!({ "email": "Ada@Example.com", "password": "correct horse", "name": "Ada" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["email"], "ada@example.com");

    let req = test::TestRequest::post()
        .uri("/api/v1/user/signup")
        .set_json(json!({ "email": "ada@example.com", "password": "another one" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Email already registered");

    let req = test::TestRequest::post()
        .uri("/api/v1/user/signin")
        .set_json(json!({ "email": "ada@example.com", "password": "wrong horse" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/api/v1/user/auth/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["data"]["name"], "Ada");

    let req = test::TestRequest::put()
        .uri("/api/v1/user/auth/password")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "oldPassword": "not it at all", "newPassword": "battery staple" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::put()
        .uri("/api/v1/user/auth/password")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "oldPassword": "correct horse", "newPassword": "battery staple" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/v1/user/signin")
        .set_json(json!({ "email": "ada@example.com", "password": "battery staple" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn signup_rejects_short_password() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/user/signup")
        .set_json(json!({ "email": "bob@example.com", "password": "short" }))
        .to_request();

    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}
