//! HTTP handlers and route configuration.

mod blog;
mod health;
mod user;

#[cfg(test)]
mod tests;

use actix_web::{Error, HttpRequest, web};

use crate::middleware::error::AppError;

fn bad_request(detail: String) -> Error {
    AppError::BadRequest(detail).into()
}

/// Render extractor failures as problem details instead of plain text.
fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req: &HttpRequest| bad_request(err.to_string())),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req: &HttpRequest| bad_request(err.to_string())),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req: &HttpRequest| bad_request(err.to_string())),
    );
}

/// Configure all application routes.
///
/// Literal segments (`bulk`, `user`, `like`, `restore`, `permanent`) are
/// registered before `/{id}` so they are never captured as ids.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(extractor_config)
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/user")
                    .route("/signup", web::post().to(user::signup))
                    .route("/signin", web::post().to(user::signin))
                    .service(
                        web::scope("/auth")
                            .route("/validate", web::get().to(user::validate))
                            .route("/me", web::get().to(user::me))
                            .route("/profile", web::put().to(user::update_profile))
                            .route("/password", web::put().to(user::change_password)),
                    ),
            )
            .service(
                web::scope("/blog")
                    .route("", web::post().to(blog::create))
                    .route("/bulk", web::get().to(blog::list_public))
                    .route("/user/bulk", web::get().to(blog::list_mine))
                    .route("/user/trash", web::get().to(blog::list_trash))
                    .route("/like/{id}", web::put().to(blog::like))
                    .route("/restore/bulk", web::put().to(blog::bulk_restore))
                    .route("/restore/{id}", web::put().to(blog::restore))
                    .route(
                        "/permanent/bulk",
                        web::delete().to(blog::bulk_permanent_delete),
                    )
                    .route("/permanent/{id}", web::delete().to(blog::permanent_delete))
                    .route("/{id}", web::get().to(blog::get))
                    .route("/{id}", web::put().to(blog::update))
                    .route("/{id}", web::delete().to(blog::soft_delete)),
            ),
    );
}
