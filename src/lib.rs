//! Wallet sign-in server library
//!
//! Sign-In with Ethereum challenge-response authentication: single-use
//! nonces, EIP-4361 message parsing, EIP-191 signature verification, and
//! JWT access tokens.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
