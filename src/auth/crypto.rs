//! Ethereum personal-sign signature verification
//!
//! Recovers the signer of an EIP-191 `personal_sign` signature and compares
//! it with the address claimed in the sign-in message.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Length of an `r || s || v` signature
pub const SIGNATURE_LENGTH: usize = 65;

const PERSONAL_SIGN_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Errors that can occur during signature verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid signature length: {0}")]
    InvalidLength(usize),

    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Verify an Ethereum wallet signature over a sign-in message
///
/// # Arguments
/// * `message` - The exact text that was signed
/// * `signature_hex` - Hex-encoded 65-byte signature, `0x` prefix optional
/// * `claimed_address` - Address the signer claims to own
///
/// # Returns
/// * `Ok(true)` if the recovered address matches `claimed_address`
/// * `Ok(false)` if recovery succeeded but yielded a different address
/// * `Err(CryptoError)` if the signature is unusable
pub fn verify_eth_signature(
    message: &str,
    signature_hex: &str,
    claimed_address: &str,
) -> Result<bool, CryptoError> {
    let recovered = recover_address(message, signature_hex)?;

    Ok(recovered.eq_ignore_ascii_case(claimed_address.trim()))
}

/// Recover the lower-case `0x` address that produced `signature_hex` over `message`
///
/// Only low-S signatures are accepted. A high-S signature (the malleable twin
/// of a valid one, with `s` replaced by `n - s` and the recovery bit flipped)
/// fails with [`CryptoError::RecoveryFailed`], even though geth's `SigToPub`
/// would recover the same key from it. Wallets produce low-S signatures.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, CryptoError> {
    let mut bytes = decode_signature(signature_hex)?;

    // Legacy wallets encode v as 27/28
    if bytes[64] >= 27 {
        bytes[64] -= 27;
    }

    let recovery_id = RecoveryId::from_byte(bytes[64]).ok_or_else(|| {
        CryptoError::InvalidEncoding(format!("Invalid recovery id: {}", bytes[64]))
    })?;

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

    let prehash = personal_message_hash(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&prehash, &signature, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;

    Ok(address_from_verifying_key(&verifying_key))
}

/// EIP-191 hash of a message: `keccak256("\x19Ethereum Signed Message:\n" || len || message)`
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_SIGN_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Derive the lower-case `0x` address of a secp256k1 public key
pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.as_affine().to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

fn decode_signature(signature_hex: &str) -> Result<[u8; SIGNATURE_LENGTH], CryptoError> {
    let trimmed = signature_hex.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(stripped).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

    <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice())
        .map_err(|_| CryptoError::InvalidLength(bytes.len()))
}
