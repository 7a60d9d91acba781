//! Per-client rate limiting
//!
//! Token bucket per client IP, refilled continuously, with a burst capacity of
//! twice the sustained rate.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::ApiError;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_update = now;
    }
}

/// Shared rate limiter state
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    rate: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let rate = f64::from(requests_per_second.max(1));
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            capacity: rate * 2.0,
        }
    }

    /// Take one token for `client`
    ///
    /// On rejection returns how long until a token is available.
    pub async fn acquire(&self, client: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        let bucket = buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity));
        bucket.refill(now, self.rate, self.capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate))
        }
    }

    /// Forget clients idle for longer than `max_idle`
    pub async fn cleanup(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_idle);
        before - buckets.len()
    }

    /// Number of tracked clients
    pub async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Middleware function, mounted with `axum::middleware::from_fn_with_state`
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    if let Err(retry_after) = limiter.acquire(&client).await {
        tracing::warn!(client = %client, "Rate limit exceeded");
        let retry_after_secs = retry_after.as_secs().max(1).to_string();
        return (
            [(header::RETRY_AFTER, retry_after_secs)],
            ApiError::TooManyRequests,
        )
            .into_response();
    }

    next.run(request).await
}

/// Client address: first hop of X-Forwarded-For, then X-Real-IP, then the socket peer
fn client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
