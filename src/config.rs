//! Runtime configuration.
//!
//! Loaded from the environment (after `.env` via dotenvy) and then
//! overridden by CLI flags.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PIN_GATE_API_URL` | Gateway base URL | `API_URL`, then `http://localhost:3000` |
//! | `PIN_GATE_ACCESS_TOKEN` | Bearer token for the user-service | none |
//! | `PIN_GATE_OFFLINE` | `1`/`true` disables backend calls | `false` |
//! | `PIN_GATE_STORE` | `file`, `keychain` or `memory` | `file` |
//! | `PIN_GATE_DATA_DIR` | Directory of the file store | `<local data dir>/pin-gate` |
//! | `PIN_GATE_LANGUAGE` | Language part of the fingerprint | `LANG` |
//! | `PIN_GATE_SCREEN` | Screen part of the fingerprint, `WIDTHxHEIGHT` | `0x0` |

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StoreKind;

pub const API_URL_ENV: &str = "PIN_GATE_API_URL";
pub const FALLBACK_API_URL_ENV: &str = "API_URL";
pub const ACCESS_TOKEN_ENV: &str = "PIN_GATE_ACCESS_TOKEN";
pub const OFFLINE_ENV: &str = "PIN_GATE_OFFLINE";
pub const STORE_ENV: &str = "PIN_GATE_STORE";
pub const DATA_DIR_ENV: &str = "PIN_GATE_DATA_DIR";
pub const LANGUAGE_ENV: &str = "PIN_GATE_LANGUAGE";
pub const SCREEN_ENV: &str = "PIN_GATE_SCREEN";

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

const APP_DIR_NAME: &str = "pin-gate";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid PIN_GATE_STORE: {0}")]
    InvalidStore(String),
    #[error("Invalid screen size '{0}', expected WIDTHxHEIGHT")]
    InvalidScreen(String),
    #[error("Could not determine a local data directory; set PIN_GATE_DATA_DIR")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub api_base_url: String,
    pub access_token: Option<String>,
    pub offline: bool,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub language: Option<String>,
    pub screen: Option<(u32, u32)>,
}

impl GateConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base_url = get(API_URL_ENV)
            .or_else(|| get(FALLBACK_API_URL_ENV))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let store = match get(STORE_ENV) {
            Some(raw) => raw.parse().map_err(ConfigError::InvalidStore)?,
            None => StoreKind::File,
        };

        let data_dir = match get(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let screen = get(SCREEN_ENV).map(|raw| parse_screen(&raw)).transpose()?;

        Ok(Self {
            api_base_url,
            access_token: get(ACCESS_TOKEN_ENV),
            offline: get(OFFLINE_ENV).is_some_and(|v| parse_flag(&v)),
            store,
            data_dir,
            language: get(LANGUAGE_ENV),
            screen,
        })
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoDataDir)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse `WIDTHxHEIGHT`, e.g. `412x915`.
pub fn parse_screen(raw: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::InvalidScreen(raw.to_string());
    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width = w.trim().parse().map_err(|_| invalid())?;
    let height = h.trim().parse().map_err(|_| invalid())?;
    Ok((width, height))
}
