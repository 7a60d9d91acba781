//! Single-use nonce store
//!
//! Issues random sign-in nonces and consumes them exactly once. The four ways
//! a consume can fail (unknown, already used, expired, wrong owner) are
//! deliberately reported as the same [`AuthError::NonceInvalid`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;

use super::error::AuthError;
use crate::models::NonceRecord;
use crate::repository::AuthRepository;

/// 128 bits of entropy, rendered as 32 lowercase hex characters
pub const NONCE_BYTES: usize = 16;

/// Default nonce lifetime
pub const DEFAULT_NONCE_TTL_SECONDS: i64 = 600;

#[derive(Clone)]
pub struct NonceStore {
    repository: Arc<dyn AuthRepository>,
    nonce_ttl_seconds: i64,
}

impl NonceStore {
    pub fn new(repository: Arc<dyn AuthRepository>, nonce_ttl_seconds: i64) -> Self {
        Self {
            repository,
            nonce_ttl_seconds,
        }
    }

    /// Issue a fresh nonce owned by `address`
    ///
    /// The address is stored lower-cased.
    pub async fn issue_nonce(&self, address: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(self.nonce_ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::StorageError(format!(
                    "nonce lifetime out of range: {}s",
                    self.nonce_ttl_seconds
                ))
            })?;

        let record = NonceRecord {
            value: generate_secure_nonce(),
            owner_address: address.trim().to_lowercase(),
            issued_at: now,
            expires_at,
            consumed: false,
            consumed_at: None,
        };

        self.repository.insert_nonce(&record).await.map_err(|e| {
            tracing::error!(error = %e, owner = %record.owner_address, "Failed to store nonce");
            AuthError::from(e)
        })?;

        tracing::debug!(
            owner = %record.owner_address,
            expires_at = %record.expires_at,
            "Nonce issued"
        );

        Ok(record.value)
    }

    /// Consume `nonce` on behalf of `address`
    pub async fn consume_nonce(&self, nonce: &str, address: &str) -> Result<(), AuthError> {
        let owner = address.trim().to_lowercase();

        let rows_affected = self
            .repository
            .consume_nonce(nonce, &owner, Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, owner = %owner, "Failed to consume nonce");
                AuthError::from(e)
            })?;

        if rows_affected == 0 {
            return Err(AuthError::NonceInvalid);
        }

        Ok(())
    }
}

/// Generate a cryptographically secure nonce
fn generate_secure_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
