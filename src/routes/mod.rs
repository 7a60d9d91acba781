//! Route definitions and the HTTP middleware stack

mod auth;

pub use auth::auth_routes;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    rate_limit, request_tracing, security_headers, RateLimiter, SecurityHeaders,
};
use crate::state::AppState;

/// Assemble the application router
///
/// Layers run outermost first: request ID, panic catching, tracing, security
/// headers, CORS, rate limiting, timeout, body limit.
pub fn build_router(state: AppState, config: &Config, rate_limiter: RateLimiter) -> Router {
    let security = SecurityHeaders {
        hsts: config.environment.is_production(),
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .merge(auth_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )))
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
        .layer(middleware::from_fn_with_state(security, security_headers))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::new())
                .layer(middleware::from_fn(request_tracing)),
        )
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static("x-request-id")])
}
