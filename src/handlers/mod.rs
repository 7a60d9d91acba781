//! API handlers

pub mod auth;
pub mod health;

pub use auth::*;
pub use health::{health, ready};

pub use crate::middleware::auth::AuthenticatedUser;
