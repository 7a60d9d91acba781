//! Storage backends for authentication state
//!
//! Both backends implement [`AuthRepository`] so the nonce store and token
//! issuer never know which one they talk to.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{AccessTokenRecord, NonceRecord};

pub use memory::InMemoryAuthRepository;
pub use postgres::PgAuthRepository;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

/// Persistence capability required by the authentication core
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Persist a freshly issued nonce
    async fn insert_nonce(&self, record: &NonceRecord) -> Result<(), StoreError>;

    /// Atomically mark a nonce consumed
    ///
    /// Applies only when the nonce exists, is unconsumed, belongs to
    /// `owner_address` and `expires_at > now`. Returns the number of records
    /// affected, which is either 0 or 1.
    async fn consume_nonce(
        &self,
        value: &str,
        owner_address: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Record an issued access token for revocation bookkeeping
    async fn record_access_token(&self, record: &AccessTokenRecord) -> Result<(), StoreError>;

    /// Delete nonce records whose `expires_at <= now`, returning how many were removed
    async fn cleanup_expired_nonces(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Delete access token records whose `expires_at <= now`, returning how many were removed
    async fn cleanup_expired_access_tokens(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}
