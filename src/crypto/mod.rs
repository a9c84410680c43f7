//! Local PIN cryptography.
//!
//! Fingerprint hashing, sealing-key derivation and AES-256-GCM envelopes.

pub mod aes;
pub mod fingerprint;
pub mod hkdf;
pub mod utils;

use thiserror::Error;

pub use aes::{open_pin, seal_pin};
pub use fingerprint::DeviceFingerprint;
pub use hkdf::derive_pin_key;
pub use utils::secrets_equal;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Malformed PIN envelope")]
    MalformedEnvelope,
    #[error("HKDF derivation failed")]
    DerivationFailed,
    #[error("Empty key material")]
    EmptyKeyMaterial,
}
