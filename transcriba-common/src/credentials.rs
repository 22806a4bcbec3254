//! Password hashing and token generation
//!
//! Passwords are stored as `hex(sha256(salt || password))` next to a
//! random per-user salt.

use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fresh random salt (hex encoded)
pub fn generate_salt() -> String {
    random_hex(SALT_BYTES)
}

/// Opaque token for access tokens and email verification
pub fn generate_token() -> String {
    random_hex(TOKEN_BYTES)
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a candidate password against a stored salt and hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    if expected_hash.is_empty() {
        return false;
    }
    let calculated = hash_password(password, salt);
    // constant-time comparison
    calculated.len() == expected_hash.len()
        && calculated
            .bytes()
            .zip(expected_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_matching_password() {
        let salt = generate_salt();
        let hash = hash_password("s3cret", &salt);
        assert!(verify_password("s3cret", &salt, &hash));
        assert!(!verify_password("S3cret", &salt, &hash));
    }

    #[test]
    fn test_salt_changes_hash() {
        assert_ne!(hash_password("pw", "aa"), hash_password("pw", "bb"));
    }

    #[test]
    fn test_empty_hash_never_verifies() {
        assert!(!verify_password("", "", ""));
    }

    #[test]
    fn test_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
