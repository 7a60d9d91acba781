//! Authentication models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Single-use sign-in nonce
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct NonceRecord {
    pub value: String,
    pub owner_address: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Issued access token, tracked by its JWT ID
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct AccessTokenRecord {
    pub jti: Uuid,
    pub owner_address: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for a sign-in nonce
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateNonceRequest {
    #[validate(custom = "validate_eth_address")]
    pub eth_addr: String,
}

/// Response containing the issued nonce
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateNonceResponse {
    pub nonce: String,
}

/// Request to verify a signed sign-in message
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1))]
    pub message: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

/// Successful verification
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub address: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Identity behind the presented access token
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub address: String,
    pub token_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// `^0x[0-9a-fA-F]{40}$`
pub fn validate_eth_address(address: &str) -> Result<(), ValidationError> {
    let valid = address
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("eth_addr"))
    }
}
