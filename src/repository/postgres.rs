//! PostgreSQL authentication store
//!
//! Nonce consumption is a single conditional `UPDATE`; the affected row count
//! is the only signal of success, so concurrent verifications of the same
//! nonce cannot both win, even across server instances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{AuthRepository, StoreError};
use crate::models::{AccessTokenRecord, NonceRecord};

#[derive(Clone)]
pub struct PgAuthRepository {
    db_pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

fn map_insert_error(e: sqlx::Error, what: String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl AuthRepository for PgAuthRepository {
    async fn insert_nonce(&self, record: &NonceRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_nonces (value, owner_address, issued_at, expires_at, consumed)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.value)
        .bind(&record.owner_address)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.consumed)
        .execute(&self.db_pool)
        .await
        .map_err(|e| map_insert_error(e, format!("nonce {}", record.value)))?;

        Ok(())
    }

    async fn consume_nonce(
        &self,
        value: &str,
        owner_address: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE auth_nonces
            SET consumed = TRUE, consumed_at = $3
            WHERE value = $1
              AND owner_address = $2
              AND consumed = FALSE
              AND expires_at > $3
            "#,
        )
        .bind(value)
        .bind(owner_address)
        .bind(now)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }

    async fn record_access_token(&self, record: &AccessTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (jti, owner_address, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.jti)
        .bind(&record.owner_address)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .execute(&self.db_pool)
        .await
        .map_err(|e| map_insert_error(e, format!("access token {}", record.jti)))?;

        Ok(())
    }

    async fn cleanup_expired_nonces(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM auth_nonces
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }

    async fn cleanup_expired_access_tokens(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM access_tokens
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}
