//! Authentication error taxonomy
//!
//! Every failure of the sign-in pipeline maps to exactly one of these kinds.
//! Client-caused kinds are reported to callers with a generic message; the
//! variant payloads are for logs only.

use thiserror::Error;

use super::crypto::CryptoError;
use super::jwt::JwtError;
use super::message::MessageParseError;
use crate::repository::StoreError;

/// Auth service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed sign-in message: {0}")]
    MalformedMessage(String),

    #[error("Signature could not be decoded: {0}")]
    SignatureDecodeError(String),

    #[error("Signature must be 65 bytes, got {0}")]
    SignatureLengthError(usize),

    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Signature does not match the claimed address")]
    SignatureInvalid,

    #[error("Domain mismatch: expected '{expected}', got '{actual}'")]
    DomainMismatch { expected: String, actual: String },

    #[error("Nonce is invalid")]
    NonceInvalid,

    #[error("Message has expired")]
    MessageExpired,

    #[error("Message is not yet valid")]
    MessageNotYetValid,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Token signing error: {0}")]
    SigningError(String),
}

impl AuthError {
    /// Stable machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedMessage(_) => "MALFORMED_MESSAGE",
            AuthError::SignatureDecodeError(_) => "SIGNATURE_DECODE_ERROR",
            AuthError::SignatureLengthError(_) => "SIGNATURE_LENGTH_ERROR",
            AuthError::RecoveryFailed(_) => "RECOVERY_FAILED",
            AuthError::SignatureInvalid => "SIGNATURE_INVALID",
            AuthError::DomainMismatch { .. } => "DOMAIN_MISMATCH",
            AuthError::NonceInvalid => "NONCE_INVALID",
            AuthError::MessageExpired => "MESSAGE_EXPIRED",
            AuthError::MessageNotYetValid => "MESSAGE_NOT_YET_VALID",
            AuthError::StorageError(_) => "STORAGE_ERROR",
            AuthError::SigningError(_) => "SIGNING_ERROR",
        }
    }

    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::StorageError(_) | AuthError::SigningError(_)
        )
    }
}

impl From<MessageParseError> for AuthError {
    fn from(e: MessageParseError) -> Self {
        AuthError::MalformedMessage(e.to_string())
    }
}

impl From<CryptoError> for AuthError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidEncoding(msg) => AuthError::SignatureDecodeError(msg),
            CryptoError::InvalidLength(len) => AuthError::SignatureLengthError(len),
            CryptoError::RecoveryFailed(msg) => AuthError::RecoveryFailed(msg),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::SigningError(e.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::StorageError(e.to_string())
    }
}
