//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/generate-nonce", post(auth::generate_nonce))
        .route("/v1/auth/verify", post(auth::verify))
        .route("/v1/auth/me", get(auth::me))
}
