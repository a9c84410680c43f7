//! Utility functions for cryptographic operations.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::aes::AES_IV_SIZE;

/// Generate a random 12-byte IV.
pub fn generate_iv() -> [u8; AES_IV_SIZE] {
    let mut iv = [0u8; AES_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

/// Lowercase hex SHA-256 of a string.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Compare two secrets without an early exit on the first differing byte.
///
/// Length is not hidden.
pub fn secrets_equal(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_secrets_equal() {
        assert!(secrets_equal("13579", "13579"));
        assert!(!secrets_equal("13579", "13578"));
        assert!(!secrets_equal("13579", "1357"));
        assert!(!secrets_equal("", "1"));
    }

    #[test]
    fn test_generate_iv_is_random() {
        assert_ne!(generate_iv(), generate_iv());
    }
}
