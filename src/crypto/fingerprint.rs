//! Device fingerprint used to name and key the local PIN slot.
//!
//! The fingerprint is `user_agent + language + screen_width + screen_height`,
//! hashed with SHA-256. It is stable per device and NOT secret.

use serde::{Deserialize, Serialize};

use super::utils::sha256_hex;

/// Prefix of the storage key holding the sealed PIN.
pub const PIN_STORAGE_PREFIX: &str = "pin_hash_";

/// Language used when neither configuration nor `LANG` provide one.
const DEFAULT_LANGUAGE: &str = "fr-FR";

/// Device attributes that make up the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFingerprint {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl DeviceFingerprint {
    pub fn new(
        user_agent: impl Into<String>,
        language: impl Into<String>,
        screen_width: u32,
        screen_height: u32,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            language: language.into(),
            screen_width,
            screen_height,
        }
    }

    /// Build a fingerprint for the current host.
    ///
    /// The user agent is synthesized from the package, OS, architecture and
    /// hostname. Language falls back to `LANG`, then to `fr-FR`. Screen size
    /// has no native source and defaults to 0x0 unless configured.
    pub fn detect(language: Option<&str>, screen: Option<(u32, u32)>) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown-host".to_string());

        let user_agent = format!(
            "{}/{} ({}; {}; {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
            host
        );

        let language = language
            .map(str::to_string)
            .or_else(|| std::env::var("LANG").ok().map(|l| normalize_lang(&l)))
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let (screen_width, screen_height) = screen.unwrap_or((0, 0));

        Self {
            user_agent,
            language,
            screen_width,
            screen_height,
        }
    }

    /// SHA-256 hex of the concatenated attributes.
    pub fn hash(&self) -> String {
        sha256_hex(&format!(
            "{}{}{}{}",
            self.user_agent, self.language, self.screen_width, self.screen_height
        ))
    }

    /// Storage key of the sealed PIN for this device.
    pub fn storage_key(&self) -> String {
        format!("{}{}", PIN_STORAGE_PREFIX, self.hash())
    }
}

/// Turn a POSIX locale (`fr_FR.UTF-8`) into a language tag (`fr-FR`).
fn normalize_lang(raw: &str) -> String {
    let base = raw.split(['.', '@']).next().unwrap_or_default();
    if base == "C" || base == "POSIX" {
        return String::new();
    }
    base.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_concatenates_attributes() {
        let fp = DeviceFingerprint::new("Mozilla/5.0", "fr-FR", 390, 844);
        assert_eq!(fp.hash(), sha256_hex("Mozilla/5.0fr-FR390844"));
    }

    #[test]
    fn test_storage_key_prefix() {
        let fp = DeviceFingerprint::new("ua", "en", 1, 2);
        let key = fp.storage_key();
        assert!(key.starts_with("pin_hash_"));
        assert_eq!(key.len(), PIN_STORAGE_PREFIX.len() + 64);
    }

    #[test]
    fn test_distinct_devices_distinct_keys() {
        let a = DeviceFingerprint::new("ua", "en", 1080, 1920);
        let b = DeviceFingerprint::new("ua", "en", 1920, 1080);
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn test_detect_uses_overrides() {
        let fp = DeviceFingerprint::detect(Some("wo-SN"), Some((360, 640)));
        assert_eq!(fp.language, "wo-SN");
        assert_eq!((fp.screen_width, fp.screen_height), (360, 640));
        assert!(fp.user_agent.starts_with("pin-gate/"));
    }

    #[test]
    fn test_detect_is_stable() {
        let a = DeviceFingerprint::detect(Some("fr-FR"), None);
        let b = DeviceFingerprint::detect(Some("fr-FR"), None);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_normalize_lang() {
        assert_eq!(normalize_lang("fr_FR.UTF-8"), "fr-FR");
        assert_eq!(normalize_lang("en_US@euro"), "en-US");
        assert_eq!(normalize_lang("C"), "");
        assert_eq!(normalize_lang("C.UTF-8"), "");
    }
}
