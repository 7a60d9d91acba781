//! HTTP middleware
//!
//! Request tracing, rate limiting, security headers, and bearer-token
//! authentication.

pub mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::AuthenticatedUser;
pub use rate_limiter::{rate_limit, RateLimiter};
pub use security::{security_headers, SecurityHeaders};
pub use self::tracing::request_tracing;
