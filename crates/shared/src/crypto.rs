//! Cryptographic utilities for single-use token generation and hashing.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Alphabet for invitation tokens. Skips look-alike characters (0, O, 1, l, I)
/// because invitation links are sometimes copied by hand.
const INVITE_TOKEN_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

/// Length of an invitation token.
pub const INVITE_TOKEN_LENGTH: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a secure random token (32 bytes, hex encoded).
pub fn generate_secure_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Generate a URL-safe invitation token.
pub fn generate_invite_token() -> String {
    let mut rng = rand::thread_rng();

    (0..INVITE_TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..INVITE_TOKEN_CHARSET.len());
            INVITE_TOKEN_CHARSET[idx] as char
        })
        .collect()
}
