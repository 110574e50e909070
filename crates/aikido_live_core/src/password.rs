//! crates/aikido_live_core/src/password.rs
//!
//! Password hashing with Argon2 and single-use token generation.

use crate::ports::{PortError, PortResult};
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Number of random bytes behind every confirmation/reset token.
const TOKEN_BYTES: usize = 32;

/// Hashes a password into a PHC string. The random salt is embedded in the output.
pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC hash.
///
/// A malformed stored hash is treated as a mismatch so callers cannot tell it
/// apart from a wrong password.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A cryptographically random, URL-safe token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
