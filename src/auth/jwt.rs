//! Access token issuance and validation
//!
//! Mints HS256 JWTs for verified wallet addresses and records each token ID
//! for later revocation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::error::AuthError;
use crate::models::AccessTokenRecord;
use crate::repository::AuthRepository;

/// Default access token lifetime (30 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 30 * 60;

/// JWT-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Issuer (service domain)
    pub iss: String,
    /// Subject (lower-cased wallet address)
    pub sub: String,
    /// Audience (service domain)
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID (for revocation)
    pub jti: String,
}

/// A signed access token and the claims inside it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AccessClaims,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    repository: Arc<dyn AuthRepository>,
    jwt_secret: Option<String>,
    domain: String,
    access_token_ttl_seconds: i64,
}

impl TokenIssuer {
    pub fn new(
        repository: Arc<dyn AuthRepository>,
        jwt_secret: Option<String>,
        domain: String,
        access_token_ttl_seconds: i64,
    ) -> Self {
        Self {
            repository,
            jwt_secret: jwt_secret.filter(|s| !s.is_empty()),
            domain,
            access_token_ttl_seconds,
        }
    }

    /// Issue an access token for a verified address
    pub async fn issue(&self, address: &str) -> Result<IssuedToken, AuthError> {
        let secret = self.jwt_secret.as_deref().ok_or(JwtError::MissingSecret)?;

        let now = Utc::now();
        let expires_at = Duration::try_seconds(self.access_token_ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                JwtError::EncodingFailed(format!(
                    "token lifetime out of range: {}s",
                    self.access_token_ttl_seconds
                ))
            })?;
        let jti = Uuid::new_v4();

        let claims = AccessClaims {
            iss: self.domain.clone(),
            sub: address.to_string(),
            aud: self.domain.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: jti.to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        self.repository
            .record_access_token(&AccessTokenRecord {
                jti,
                owner_address: address.to_string(),
                issued_at: now,
                expires_at,
            })
            .await?;

        Ok(IssuedToken {
            token,
            claims,
            expires_in: self.access_token_ttl_seconds,
        })
    }

    /// Verify and decode an access token issued by this service
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let secret = self.jwt_secret.as_deref().ok_or(JwtError::MissingSecret)?;
        verify_token(token, secret, &self.domain)
    }
}

/// Verify and decode a JWT access token
///
/// # Arguments
/// * `token` - The JWT token string
/// * `secret` - JWT signing secret
/// * `domain` - Expected issuer and audience
pub fn verify_token(token: &str, secret: &str, domain: &str) -> Result<AccessClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_issuer(&[domain]);
    validation.set_audience(&[domain]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);

    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        ErrorKind::ImmatureSignature => JwtError::TokenNotYetValid,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}
