//! In-memory authentication store
//!
//! Used for development and tests. Each operation runs under a single write
//! lock, which gives the same all-or-nothing consume semantics as the
//! conditional `UPDATE` of the Postgres backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthRepository, StoreError};
use crate::models::{AccessTokenRecord, NonceRecord};

#[derive(Default)]
pub struct InMemoryAuthRepository {
    nonces: RwLock<HashMap<String, NonceRecord>>,
    access_tokens: RwLock<HashMap<Uuid, AccessTokenRecord>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a nonce record
    pub async fn get_nonce(&self, value: &str) -> Option<NonceRecord> {
        self.nonces.read().await.get(value).cloned()
    }

    /// Look up a recorded access token
    pub async fn get_access_token(&self, jti: Uuid) -> Option<AccessTokenRecord> {
        self.access_tokens.read().await.get(&jti).cloned()
    }
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    async fn insert_nonce(&self, record: &NonceRecord) -> Result<(), StoreError> {
        let mut nonces = self.nonces.write().await;

        if nonces.contains_key(&record.value) {
            return Err(StoreError::Duplicate(format!("nonce {}", record.value)));
        }

        nonces.insert(record.value.clone(), record.clone());
        Ok(())
    }

    async fn consume_nonce(
        &self,
        value: &str,
        owner_address: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut nonces = self.nonces.write().await;

        match nonces.get_mut(value) {
            Some(record)
                if !record.consumed
                    && record.owner_address == owner_address
                    && record.expires_at > now =>
            {
                record.consumed = true;
                record.consumed_at = Some(now);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn record_access_token(&self, record: &AccessTokenRecord) -> Result<(), StoreError> {
        let mut tokens = self.access_tokens.write().await;

        if tokens.contains_key(&record.jti) {
            return Err(StoreError::Duplicate(format!("access token {}", record.jti)));
        }

        tokens.insert(record.jti, record.clone());
        Ok(())
    }

    async fn cleanup_expired_nonces(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut nonces = self.nonces.write().await;
        let before = nonces.len();

        nonces.retain(|_, record| record.expires_at > now);

        Ok((before - nonces.len()) as u64)
    }

    async fn cleanup_expired_access_tokens(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut tokens = self.access_tokens.write().await;
        let before = tokens.len();

        tokens.retain(|_, record| record.expires_at > now);

        Ok((before - tokens.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
