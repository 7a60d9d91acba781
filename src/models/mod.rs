//! Data models for the auth server

pub mod auth;
pub use auth::*;
