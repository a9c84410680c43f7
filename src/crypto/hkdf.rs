//! HKDF-SHA256 derivation of the PIN sealing key.
//!
//! Derivation path:
//!   device fingerprint hash (64 hex chars)
//!     -> HKDF-SHA256(salt="PinGate-v1", info="pin-gate-local-pin-v1")
//!     -> 32-byte AES-256-GCM key
//!
//! The input is the same non-secret string that names the storage slot, so
//! anything on the device able to recompute the fingerprint can open the blob.

use hkdf::Hkdf;
use sha2::Sha256;

use super::aes::AES_KEY_SIZE;
use super::CryptoError;

const HKDF_SALT: &[u8] = b"PinGate-v1";

const PIN_KEY_INFO: &[u8] = b"pin-gate-local-pin-v1";

/// Derive the AES key used to seal the local PIN from a fingerprint hash.
pub fn derive_pin_key(fingerprint_hash: &str) -> Result<[u8; AES_KEY_SIZE], CryptoError> {
    if fingerprint_hash.is_empty() {
        return Err(CryptoError::EmptyKeyMaterial);
    }

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), fingerprint_hash.as_bytes());
    let mut okm = [0u8; AES_KEY_SIZE];
    hk.expand(PIN_KEY_INFO, &mut okm)
        .map_err(|_| CryptoError::DerivationFailed)?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_pin_key("abc123").unwrap();
        let b = derive_pin_key("abc123").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_fingerprints_give_different_keys() {
        let a = derive_pin_key("abc123").unwrap();
        let b = derive_pin_key("abc124").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            derive_pin_key(""),
            Err(CryptoError::EmptyKeyMaterial)
        ));
    }
}
