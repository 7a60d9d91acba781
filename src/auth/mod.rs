//! Wallet authentication
//!
//! Sign-In with Ethereum challenge-response:
//! - Single-use nonces bound to the requesting address
//! - EIP-4361 message parsing
//! - EIP-191 signature recovery over secp256k1
//! - JWT access tokens for verified wallets

pub mod crypto;
pub mod error;
pub mod jwt;
pub mod message;
pub mod nonce;
pub mod service;

pub use crypto::{recover_address, verify_eth_signature, CryptoError};
pub use error::AuthError;
pub use jwt::{verify_token, AccessClaims, IssuedToken, JwtError, TokenIssuer};
pub use message::{MessageParseError, SiweMessage};
pub use nonce::NonceStore;
pub use service::{AuthService, VerifiedSession};
