//! Authentication HTTP handlers
//!
//! Endpoints for Sign-In with Ethereum.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    GenerateNonceRequest, GenerateNonceResponse, SessionResponse, VerifyRequest, VerifyResponse,
};
use crate::state::AppState;

/// POST /v1/auth/generate-nonce - Issue a single-use nonce for a wallet
pub async fn generate_nonce(
    State(state): State<AppState>,
    payload: Result<Json<GenerateNonceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerateNonceResponse>), ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let nonce = state.auth_service.issue_challenge(&req.eth_addr).await?;

    Ok((StatusCode::CREATED, Json(GenerateNonceResponse { nonce })))
}

/// POST /v1/auth/verify - Verify a signed message and issue an access token
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state
        .auth_service
        .verify_response(&req.message, &req.signature)
        .await?;

    Ok(Json(VerifyResponse {
        valid: true,
        address: session.address,
        access_token: session.token.token,
        token_type: "Bearer".to_string(),
        expires_in: session.token.expires_in,
    }))
}

/// GET /v1/auth/me - Identity behind the presented access token
pub async fn me(user: AuthenticatedUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        address: user.address,
        token_id: user.token_id,
        issued_at: user.issued_at,
        expires_at: user.expires_at,
    })
}
