//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, NonceStore, TokenIssuer};
use crate::config::Config;
use crate::repository::AuthRepository;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub repository: Arc<dyn AuthRepository>,
}

impl AppState {
    pub fn new(auth_service: Arc<AuthService>, repository: Arc<dyn AuthRepository>) -> Self {
        Self {
            auth_service,
            repository,
        }
    }

    /// Wire the nonce store, token issuer and auth service over `repository`
    pub fn from_config(config: &Config, repository: Arc<dyn AuthRepository>) -> Self {
        let nonce_store = NonceStore::new(repository.clone(), config.auth_nonce_ttl_seconds);
        let token_issuer = TokenIssuer::new(
            repository.clone(),
            config.jwt_secret.clone(),
            config.auth_domain.clone(),
            config.access_token_ttl_seconds,
        );
        let auth_service = AuthService::new(nonce_store, token_issuer, config.auth_domain.clone());

        Self::new(Arc::new(auth_service), repository)
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}
