//! Authentication middleware
//!
//! Extracts the wallet behind a bearer access token.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthService, JwtError};

/// Wallet identity carried by a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Lower-cased wallet address
    pub address: String,
    pub token_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct TokenRejection {
    error: TokenRejectionDetails,
}

#[derive(Debug, Serialize)]
struct TokenRejectionDetails {
    code: String,
    message: String,
}

impl TokenRejection {
    fn new(code: &str, message: &str) -> Self {
        Self {
            error: TokenRejectionDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }

    fn from_jwt_error(err: &JwtError) -> Response {
        match err {
            JwtError::TokenExpired => {
                Self::new("TOKEN_EXPIRED", "Token has expired").into_response()
            }
            JwtError::MissingSecret | JwtError::EncodingFailed(_) => {
                tracing::error!(error = %err, "Access token validation unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(Self::new("INTERNAL_ERROR", "something went wrong")),
                )
                    .into_response()
            }
            _ => Self::new("INVALID_TOKEN", "Invalid token").into_response(),
        }
    }
}

impl IntoResponse for TokenRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Extractor for authenticated wallets
///
/// Verifies the JWT from the Authorization header against the service
/// domain and secret.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.address)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    TokenRejection::new(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = auth_service
            .verify_access_token(bearer.token())
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                TokenRejection::from_jwt_error(&e)
            })?;

        Ok(AuthenticatedUser {
            address: claims.sub,
            token_id: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
