//! Account handlers: signup, signin and profile management.

use actix_web::{HttpRequest, HttpResponse, web};

use blogg_core::DomainError;
use blogg_core::domain::{ProfileChanges, User};
use blogg_shared::ApiResponse;
use blogg_shared::dto::{
    AuthResponse, ChangePasswordRequest, SigninRequest, SignupRequest, TokenValidResponse,
    UpdateProfileRequest, UserResponse,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const BAD_CREDENTIALS: &str = "Invalid email or password";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> AppResult<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn user_response(user: User) -> UserResponse {
    UserResponse {
        user_id: user.id,
        email: user.email,
        name: user.name,
        profile_image: user.profile_image,
    }
}

fn issue_token(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state.tokens.generate_token(user.id, &user.email)?;
    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
        user_id: user.id,
        email: user.email.clone(),
    })
}

/// Hashing runs on the blocking pool.
async fn hash_password(state: &AppState, password: String) -> AppResult<String> {
    let passwords = state.passwords.clone();
    web::block(move || passwords.hash(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

async fn verify_password(state: &AppState, password: String, hash: String) -> AppResult<bool> {
    let passwords = state.passwords.clone();
    web::block(move || passwords.verify(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

/// Run the captcha check when one is configured.
async fn check_human(state: &AppState, req: &HttpRequest, token: Option<&str>) -> AppResult<()> {
    let Some(verifier) = state.human_check.as_ref() else {
        return Ok(());
    };

    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Captcha token is required".to_string()))?;
    let remote_ip = req.peer_addr().map(|addr| addr.ip().to_string());

    if verifier.verify(token, remote_ip.as_deref()).await? {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Captcha verification failed".to_string(),
        ))
    }
}

/// POST /api/v1/user/signup
pub async fn signup(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    check_human(&state, &req, body.captcha_token.as_deref()).await?;

    let email = normalize_email(&body.email);
    validate_email(&email)?;
    validate_password(&body.password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(DomainError::email_taken().into());
    }

    let password_hash = hash_password(&state, body.password).await?;
    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let user = state
        .users
        .insert(User::new(email, name, password_hash))
        .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    let auth = issue_token(&state, &user)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(auth, "Account created")))
}

/// POST /api/v1/user/signin
pub async fn signin(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<SigninRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    check_human(&state, &req, body.captcha_token.as_deref()).await?;

    let email = normalize_email(&body.email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    if !verify_password(&state, body.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "Signin with wrong password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let auth = issue_token(&state, &user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(auth)))
}

/// GET /api/v1/user/auth/validate
pub async fn validate(_identity: Identity) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(TokenValidResponse { valid: true }))
}

/// GET /api/v1/user/auth/me
pub async fn me(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(user))))
}

/// PUT /api/v1/user/auth/profile
pub async fn update_profile(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let changes = ProfileChanges {
        name: non_blank(body.name),
        email: non_blank(body.email).map(|e| normalize_email(&e)),
        profile_image: non_blank(body.profile_image),
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    if let Some(email) = changes.email.as_deref() {
        validate_email(email)?;
        let taken = state.users.find_by_email(email).await?;
        if taken.is_some_and(|other| other.id != identity.user_id) {
            return Err(DomainError::email_taken().into());
        }
    }

    let user = state
        .users
        .update_profile(identity.user_id, changes)
        .await
        .map_err(|e| match e {
            blogg_core::error::RepoError::NotFound => {
                AppError::NotFound("User not found".to_string())
            }
            other => other.into(),
        })?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        user_response(user),
        "Profile updated",
    )))
}

/// PUT /api/v1/user/auth/password
pub async fn change_password(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Old and new password are required".to_string(),
        ));
    }
    validate_password(&body.new_password)?;

    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&state, body.old_password, user.password_hash).await? {
        return Err(AppError::Forbidden("Old password is incorrect".to_string()));
    }

    let password_hash = hash_password(&state, body.new_password).await?;
    state
        .users
        .update_password(identity.user_id, password_hash)
        .await?;

    tracing::info!(user_id = %identity.user_id, "Password changed");
    Ok(HttpResponse::Ok().json(ApiResponse::done("Password updated")))
}
