//! Per-client-IP rate limiting middleware.

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use blogg_core::ports::RateLimiter;
use blogg_shared::ErrorResponse;

use super::error::retry_after_secs;

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            // Socket peer only; forwarded headers are client-controlled.
            let key = req
                .peer_addr()
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            match limiter.check(&key).await {
                Ok(result) if !result.allowed => {
                    tracing::warn!(client = %key, path = %req.path(), "Rate limit exceeded");

                    let secs = retry_after_secs(result.reset_after);
                    let response = HttpResponse::TooManyRequests()
                        .insert_header(("X-RateLimit-Remaining", "0"))
                        .insert_header(("Retry-After", secs.to_string()))
                        .json(ErrorResponse::too_many_requests(secs));

                    let (http_req, _payload) = req.into_parts();
                    return Ok(ServiceResponse::new(http_req, response).map_into_right_body());
                }
                Ok(_) => {}
                Err(e) => {
                    // Fail open.
                    tracing::error!(error = %e, "Rate limiter error");
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test, web};
    use blogg_infra::{InMemoryRateLimiter, RateLimitConfig};
    use std::net::SocketAddr;
    use std::time::Duration;

    fn limited(max_requests: u32) -> Arc<InMemoryRateLimiter> {
        Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        }))
    }

    #[actix_rt::test]
    async fn forwarded_headers_do_not_open_new_buckets() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limited(1)))
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();

        let mut allowed = 0;
        for i in 0..5 {
            let req = test::TestRequest::get()
                .uri("/ping")
                .peer_addr(peer)
                .insert_header(("X-Forwarded-For", format!("1.2.3.{i}")))
                .insert_header(("Forwarded", format!("for=4.3.2.{i}")))
                .to_request();
            if test::call_service(&app, req).await.status() == StatusCode::OK {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 1);

        let other = test::TestRequest::get()
            .uri("/ping")
            .peer_addr("10.0.0.2:5000".parse().unwrap())
            .to_request();
        assert_eq!(test::call_service(&app, other).await.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn rejects_once_the_burst_is_spent() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limited(2)))
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for _ in 0..2 {
            let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request())
                .await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("Retry-After"));
    }
}
