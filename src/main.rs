//! Wallet sign-in server
//!
//! Serves Sign-In with Ethereum nonce issuance and verification over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use jibe_auth_server::config::{Config, NonceStoreBackend};
use jibe_auth_server::db;
use jibe_auth_server::middleware::RateLimiter;
use jibe_auth_server::repository::{AuthRepository, InMemoryAuthRepository, PgAuthRepository};
use jibe_auth_server::routes::build_router;
use jibe_auth_server::state::AppState;

/// Rate limiter buckets idle this long are dropped
const RATE_LIMIT_IDLE: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(&config);

    tracing::info!(
        environment = config.environment.as_str(),
        domain = %config.auth_domain,
        "Starting auth server"
    );

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set, sign-in will fail at token issuance");
    }

    let repository: Arc<dyn AuthRepository> = match config.nonce_store {
        NonceStoreBackend::Postgres => {
            let pool = db::create_pool(&config).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgAuthRepository::new(pool))
        }
        NonceStoreBackend::Memory => {
            tracing::warn!("Using in-memory nonce store, state is lost on restart");
            Arc::new(InMemoryAuthRepository::new())
        }
    };

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);

    spawn_expired_record_cleanup(
        repository.clone(),
        Duration::from_secs(config.nonce_cleanup_interval_seconds.max(1)),
    );
    spawn_rate_limiter_cleanup(rate_limiter.clone());

    let app_state = AppState::from_config(&config, repository);
    let app = build_router(app_state, &config, rate_limiter);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}

/// Periodically prune expired nonces and access token records
fn spawn_expired_record_cleanup(repository: Arc<dyn AuthRepository>, every: Duration) {
    tokio::spawn(async move {
        tracing::info!(interval_secs = every.as_secs(), "Expired record cleanup task started");
        let mut ticker = tokio::time::interval(every);

        loop {
            ticker.tick().await;
            let now = Utc::now();

            match repository.cleanup_expired_nonces(now).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired nonces removed"),
                Err(e) => tracing::error!(error = %e, "Nonce cleanup failed"),
            }

            match repository.cleanup_expired_access_tokens(now).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired access tokens removed"),
                Err(e) => tracing::error!(error = %e, "Access token cleanup failed"),
            }
        }
    });
}

fn spawn_rate_limiter_cleanup(rate_limiter: RateLimiter) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));

        loop {
            ticker.tick().await;
            let dropped = rate_limiter.cleanup(RATE_LIMIT_IDLE).await;
            if dropped > 0 {
                tracing::debug!(dropped, "Idle rate limit buckets dropped");
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
