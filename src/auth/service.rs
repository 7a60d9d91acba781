//! Authentication service
//!
//! Core business logic for wallet-based authentication: issues challenges and
//! verifies signed Sign-In with Ethereum responses.

use chrono::{DateTime, Utc};

use super::crypto::verify_eth_signature;
use super::error::AuthError;
use super::jwt::{AccessClaims, IssuedToken, JwtError, TokenIssuer};
use super::message::SiweMessage;
use super::nonce::NonceStore;

/// Outcome of a successful sign-in
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    /// Lower-cased wallet address
    pub address: String,
    pub token: IssuedToken,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    nonce_store: NonceStore,
    token_issuer: TokenIssuer,
    domain: String,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(nonce_store: NonceStore, token_issuer: TokenIssuer, domain: String) -> Self {
        Self {
            nonce_store,
            token_issuer,
            domain,
        }
    }

    /// Issue a sign-in nonce for a wallet address
    pub async fn issue_challenge(&self, address: &str) -> Result<String, AuthError> {
        self.nonce_store.issue_nonce(address).await
    }

    /// Verify a signed message and issue an access token
    pub async fn verify_response(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<VerifiedSession, AuthError> {
        let address = self.verify_message(message, signature).await?;
        let token = self.token_issuer.issue(&address).await?;

        tracing::info!(address = %address, jti = %token.claims.jti, "Wallet sign-in succeeded");

        Ok(VerifiedSession { address, token })
    }

    /// Run the verification pipeline, returning the lower-cased signer address
    ///
    /// The signature and domain are checked before the nonce is consumed, so a
    /// request that fails either check leaves the nonce usable.
    pub async fn verify_message(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<String, AuthError> {
        let siwe = SiweMessage::parse(message).map_err(|e| {
            tracing::debug!(error = %e, "Sign-in message rejected");
            AuthError::from(e)
        })?;

        match verify_eth_signature(message, signature, &siwe.address) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    claimed = %siwe.address,
                    "Signature does not match claimed address"
                );
                return Err(AuthError::SignatureInvalid);
            }
            Err(e) => {
                let cause = AuthError::from(e);
                tracing::debug!(kind = cause.kind(), error = %cause, "Signature rejected");
                return Err(AuthError::SignatureInvalid);
            }
        }

        if siwe.domain != self.domain {
            tracing::warn!(
                expected = %self.domain,
                actual = %siwe.domain,
                "Sign-in domain mismatch"
            );
            return Err(AuthError::DomainMismatch {
                expected: self.domain.clone(),
                actual: siwe.domain,
            });
        }

        let address = siwe.address.to_lowercase();

        self.nonce_store.consume_nonce(&siwe.nonce, &address).await?;

        let now = Utc::now();

        if let Some(expiration_time) = &siwe.expiration_time {
            if now > parse_timestamp("Expiration Time", expiration_time)? {
                return Err(AuthError::MessageExpired);
            }
        }

        if let Some(not_before) = &siwe.not_before {
            if now < parse_timestamp("Not Before", not_before)? {
                return Err(AuthError::MessageNotYetValid);
            }
        }

        Ok(address)
    }

    /// Verify an access token previously issued by this service
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.token_issuer.verify(token)
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AuthError::MalformedMessage(format!("Invalid {}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use k256::ecdsa::SigningKey;

    use crate::auth::crypto::personal_message_hash;
    use crate::repository::InMemoryAuthRepository;

    const DOMAIN: &str = "example.com";
    const PRIVATE_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn signing_key() -> SigningKey {
        SigningKey::from_slice(&hex::decode(PRIVATE_KEY).unwrap()).unwrap()
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&personal_message_hash(message))
            .unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    fn service() -> AuthService {
        let repo = Arc::new(InMemoryAuthRepository::new());
        AuthService::new(
            NonceStore::new(repo.clone(), 600),
            TokenIssuer::new(
                repo,
                Some("test-secret-key".to_string()),
                DOMAIN.to_string(),
                1800,
            ),
            DOMAIN.to_string(),
        )
    }

    fn message(nonce: &str) -> SiweMessage {
        SiweMessage {
            domain: DOMAIN.to_string(),
            address: ADDRESS.to_string(),
            statement: "Sign in to Jibe".to_string(),
            uri: "https://example.com".to_string(),
            version: "1".to_string(),
            chain_id: "1".to_string(),
            nonce: nonce.to_string(),
            issued_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_in_then_replay() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let text = message(&nonce).to_string();
        let signature = sign(&signing_key(), &text);

        let session = service.verify_response(&text, &signature).await.unwrap();
        assert_eq!(session.address, ADDRESS.to_lowercase());
        assert_eq!(session.token.claims.sub, ADDRESS.to_lowercase());
        assert_eq!(
            service.verify_access_token(&session.token.token).unwrap(),
            session.token.claims
        );

        let replay = service.verify_response(&text, &signature).await;
        assert_eq!(replay.unwrap_err(), AuthError::NonceInvalid);
    }

    #[tokio::test]
    async fn test_expired_message() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let mut siwe = message(&nonce);
        siwe.expiration_time = Some("2000-01-01T00:00:00Z".to_string());
        let text = siwe.to_string();

        let result = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert_eq!(result, Err(AuthError::MessageExpired));
    }

    #[tokio::test]
    async fn test_future_expiration_is_accepted() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let mut siwe = message(&nonce);
        siwe.expiration_time = Some((Utc::now() + Duration::minutes(5)).to_rfc3339());
        siwe.not_before = Some((Utc::now() - Duration::minutes(5)).to_rfc3339());
        let text = siwe.to_string();

        let result = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert_eq!(result, Ok(ADDRESS.to_lowercase()));
    }

    #[tokio::test]
    async fn test_not_yet_valid_message() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let mut siwe = message(&nonce);
        siwe.not_before = Some((Utc::now() + Duration::hours(1)).to_rfc3339());
        let text = siwe.to_string();

        let result = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert_eq!(result, Err(AuthError::MessageNotYetValid));
    }

    #[tokio::test]
    async fn test_unparseable_expiration_is_malformed() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let mut siwe = message(&nonce);
        siwe.expiration_time = Some("tomorrow-ish".to_string());
        let text = siwe.to_string();

        let result = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert!(matches!(result, Err(AuthError::MalformedMessage(_))));
    }

    #[tokio::test]
    async fn test_malformed_message() {
        let service = service();
        let result = service.verify_message("hello", "0x00").await;
        assert!(matches!(result, Err(AuthError::MalformedMessage(_))));
    }

    #[tokio::test]
    async fn test_invalid_signature_leaves_nonce_usable() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let text = message(&nonce).to_string();

        let impostor = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let forged = service.verify_message(&text, &sign(&impostor, &text)).await;
        assert_eq!(forged, Err(AuthError::SignatureInvalid));

        let garbage = service.verify_message(&text, "0x1234").await;
        assert_eq!(garbage, Err(AuthError::SignatureInvalid));

        let legit = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert_eq!(legit, Ok(ADDRESS.to_lowercase()));
    }

    #[tokio::test]
    async fn test_domain_mismatch_leaves_nonce_usable() {
        let service = service();
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();

        let mut phishing = message(&nonce);
        phishing.domain = "evil.example".to_string();
        let phishing_text = phishing.to_string();
        let result = service
            .verify_message(&phishing_text, &sign(&signing_key(), &phishing_text))
            .await;
        assert!(matches!(result, Err(AuthError::DomainMismatch { .. })));

        let text = message(&nonce).to_string();
        let legit = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert_eq!(legit, Ok(ADDRESS.to_lowercase()));
    }

    #[tokio::test]
    async fn test_nonce_for_other_address_is_rejected() {
        let service = service();
        let nonce = service
            .issue_challenge("0x0000000000000000000000000000000000000001")
            .await
            .unwrap();
        let text = message(&nonce).to_string();

        let result = service.verify_message(&text, &sign(&signing_key(), &text)).await;
        assert_eq!(result, Err(AuthError::NonceInvalid));
    }

    #[tokio::test]
    async fn test_missing_secret_fails_after_verification() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let service = AuthService::new(
            NonceStore::new(repo.clone(), 600),
            TokenIssuer::new(repo, None, DOMAIN.to_string(), 1800),
            DOMAIN.to_string(),
        );
        let nonce = service.issue_challenge(ADDRESS).await.unwrap();
        let text = message(&nonce).to_string();

        let result = service.verify_response(&text, &sign(&signing_key(), &text)).await;
        assert!(matches!(result, Err(AuthError::SigningError(_))));
    }
}
