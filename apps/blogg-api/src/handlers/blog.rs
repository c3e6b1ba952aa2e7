//! Post handlers.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures::StreamExt;
use uuid::Uuid;

use blogg_core::domain::{Post, PostDraft, PostEdit};
use blogg_shared::ApiResponse;
use blogg_shared::dto::{
    BulkIdsRequest, BulkResponse, LikeRequest, PageQuery, PostListResponse, PostPageResponse,
    PostResponse, UpdatePostRequest,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Largest accepted multipart field, cover image included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub(crate) fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        title: post.title,
        content: post.content,
        cover_image: post.cover_image,
        author_id: post.author_id,
        author_name: post.author_name,
        likes: post.likes,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

fn post_list(posts: Vec<Post>) -> PostListResponse {
    PostListResponse {
        posts: posts.into_iter().map(post_response).collect(),
    }
}

/// Fields of the create form.
#[derive(Debug, Default)]
struct CreateForm {
    title: String,
    content: String,
    author_name: Option<String>,
    cover_url: Option<String>,
    cover_file: Option<(Vec<u8>, String)>,
}

async fn read_field(field: &mut Field) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?;
        if buf.len() + chunk.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::BadRequest(format!(
                "Upload exceeds {} MiB limit",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn field_text(bytes: Vec<u8>, name: &str) -> AppResult<String> {
    String::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest(format!("Field `{name}` must be UTF-8 text")))
}

async fn read_create_form(mut payload: Multipart) -> AppResult<CreateForm> {
    let mut form = CreateForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        let bytes = read_field(&mut field).await?;

        match (name.as_str(), filename) {
            ("coverImage", Some(filename)) => {
                if !bytes.is_empty() {
                    form.cover_file = Some((bytes, filename));
                }
            }
            ("coverImage", None) => {
                let url = field_text(bytes, &name)?;
                form.cover_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
            }
            ("title", _) => form.title = field_text(bytes, &name)?,
            ("content", _) => form.content = field_text(bytes, &name)?,
            ("authorName", _) => {
                let author = field_text(bytes, &name)?;
                form.author_name = Some(author.trim().to_string()).filter(|a| !a.is_empty());
            }
            _ => tracing::debug!(field = %name, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Resolve the cover image URL. An uploaded file wins over a URL field.
/// Upload failures fall back to the placeholder rather than failing the post.
async fn resolve_cover(state: &AppState, form: &mut CreateForm) -> Option<String> {
    let Some((bytes, filename)) = form.cover_file.take() else {
        return form.cover_url.take();
    };

    let Some(images) = state.images.as_ref() else {
        tracing::debug!("No image host configured, ignoring uploaded cover");
        return form.cover_url.take();
    };

    match images.upload(bytes, &filename).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(error = %e, filename = %filename, "Cover upload failed, using placeholder");
            None
        }
    }
}

/// POST /api/v1/blog
pub async fn create(
    identity: Identity,
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = read_create_form(payload).await?;
    if form.title.trim().is_empty() || form.content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    let cover_image = resolve_cover(&state, &mut form).await;
    let draft = PostDraft {
        title: form.title,
        content: form.content,
        cover_image,
        author_name: form.author_name,
    };
    let post = state.posts.create(identity.user_id, draft).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        post_response(post),
        "Post created",
    )))
}

/// GET /api/v1/blog/bulk?cursor=&limit=
pub async fn list_public(
    _identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let PageQuery { cursor, limit } = query.into_inner();
    let page = state.posts.list_public(cursor, limit).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostPageResponse {
        posts: page.posts.into_iter().map(post_response).collect(),
        next_cursor: page.next_cursor,
    })))
}

/// GET /api/v1/blog/user/bulk
pub async fn list_mine(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.posts.list_by_author(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_list(posts))))
}

/// GET /api/v1/blog/user/trash
pub async fn list_trash(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.posts.list_trash_by_author(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_list(posts))))
}

/// GET /api/v1/blog/{id}
pub async fn get(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state.posts.get_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(post))))
}

/// PUT /api/v1/blog/{id}
pub async fn update(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let edit = PostEdit {
        title: body.title,
        content: body.content,
        cover_image: body
            .cover_image
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };
    let post = state
        .posts
        .update(identity.user_id, path.into_inner(), edit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(post),
        "Post updated",
    )))
}

/// PUT /api/v1/blog/like/{id}
pub async fn like(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<LikeRequest>,
) -> AppResult<HttpResponse> {
    let key = format!("like:{}", identity.user_id);
    match state.like_limiter.check(&key).await {
        Ok(result) if !result.allowed => {
            tracing::warn!(user_id = %identity.user_id, "Like rate limit exceeded");
            return Err(AppError::TooManyRequests(result.reset_after));
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Like rate limiter error"),
    }

    state
        .posts
        .set_like(path.into_inner(), body.increment)
        .await?;

    let message = if body.increment { "Post liked" } else { "Like removed" };
    Ok(HttpResponse::Ok().json(ApiResponse::done(message)))
}

/// DELETE /api/v1/blog/{id}
pub async fn soft_delete(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .soft_delete(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::done("Post moved to trash")))
}

/// PUT /api/v1/blog/restore/{id}
pub async fn restore(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .restore(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(post),
        "Post restored",
    )))
}

/// PUT /api/v1/blog/restore/bulk
pub async fn bulk_restore(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<BulkIdsRequest>,
) -> AppResult<HttpResponse> {
    let affected = state
        .posts
        .bulk_restore(identity.user_id, &body.ids)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(BulkResponse { affected })))
}

/// DELETE /api/v1/blog/permanent/{id}
pub async fn permanent_delete(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .permanent_delete(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::done("Post permanently deleted")))
}

/// DELETE /api/v1/blog/permanent/bulk
pub async fn bulk_permanent_delete(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<BulkIdsRequest>,
) -> AppResult<HttpResponse> {
    let affected = state
        .posts
        .bulk_permanent_delete(identity.user_id, &body.ids)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(BulkResponse { affected })))
}
