//! AES-256-GCM sealing of the stored PIN.
//!
//! Envelope format: base64( IV (12 bytes) || Ciphertext || Auth Tag (16 bytes) )
//! The envelope is a plain string so it fits any string-to-string store.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use zeroize::Zeroizing;

use super::utils::generate_iv;
use super::CryptoError;

/// AES-256-GCM key size in bytes (256 bits).
pub const AES_KEY_SIZE: usize = 32;

/// AES-GCM IV size in bytes (96 bits).
pub const AES_IV_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits).
pub const AES_TAG_SIZE: usize = 16;

/// Minimum sealed data size: IV + auth tag (empty plaintext).
const MIN_SEALED_SIZE: usize = AES_IV_SIZE + AES_TAG_SIZE;

/// Seal bytes with a fresh random IV. Returns `IV || ciphertext || tag`.
pub fn seal(plaintext: &[u8], key: &[u8; AES_KEY_SIZE]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::EncryptionFailed)?;
    let iv = generate_iv();

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(AES_IV_SIZE + ciphertext.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open bytes produced by [`seal`].
pub fn unseal(sealed: &[u8], key: &[u8; AES_KEY_SIZE]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (iv, ciphertext) = sealed.split_at(AES_IV_SIZE);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt a PIN into a base64 envelope string.
pub fn seal_pin(pin: &str, key: &[u8; AES_KEY_SIZE]) -> Result<String, CryptoError> {
    let sealed = seal(pin.as_bytes(), key)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
}

/// Decrypt a base64 envelope back into the PIN string.
///
/// The returned string is wiped from memory when dropped.
pub fn open_pin(envelope: &str, key: &[u8; AES_KEY_SIZE]) -> Result<Zeroizing<String>, CryptoError> {
    let sealed = base64::engine::general_purpose::STANDARD
        .decode(envelope.trim())
        .map_err(|_| CryptoError::MalformedEnvelope)?;
    let plain = Zeroizing::new(unseal(&sealed, key)?);

    let pin = std::str::from_utf8(&plain).map_err(|_| CryptoError::MalformedEnvelope)?;
    Ok(Zeroizing::new(pin.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn test_seal_layout() {
        let sealed = seal(b"48213", &KEY).unwrap();
        assert_eq!(sealed.len(), AES_IV_SIZE + 5 + AES_TAG_SIZE);
    }

    #[test]
    fn test_seal_uses_fresh_iv() {
        let a = seal_pin("48213", &KEY).unwrap();
        let b = seal_pin("48213", &KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_pin() {
        let envelope = seal_pin("48213", &KEY).unwrap();
        assert_eq!(open_pin(&envelope, &KEY).unwrap().as_str(), "48213");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let envelope = seal_pin("48213", &KEY).unwrap();
        let result = open_pin(&envelope, &[8u8; 32]);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_open_tampered_envelope_fails() {
        let mut sealed = seal(b"48213", &KEY).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(unseal(&sealed, &KEY).is_err());
    }

    #[test]
    fn test_open_garbage() {
        assert!(matches!(
            open_pin("not base64 !!", &KEY),
            Err(CryptoError::MalformedEnvelope)
        ));
        // Valid base64 but shorter than IV + tag
        assert!(matches!(
            open_pin("AAAA", &KEY),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}
