//! Results returned to the UI.
//!
//! Every user-facing failure is a value with a display message, never an `Err`.

use serde::Serialize;

pub const PIN_SETUP_SUCCESS: &str = "Code PIN configuré avec succès";
pub const PIN_CHANGE_SUCCESS: &str = "Code PIN modifié avec succès";
pub const PINS_DO_NOT_MATCH: &str = "Les codes PIN ne correspondent pas";
pub const CURRENT_PIN_INCORRECT: &str = "Code PIN actuel incorrect";
pub const PIN_INCORRECT: &str = "Code PIN incorrect";
pub const PIN_SETUP_FAILED: &str = "Erreur lors de la configuration du code PIN";
pub const PIN_CHANGE_FAILED: &str = "Erreur lors de la modification du code PIN";

/// Displayed on a failed verification. There is no lockout behind it.
pub const DISPLAYED_ATTEMPTS_LEFT: u32 = 3;

/// Outcome of a setup or change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinOutcome {
    pub success: bool,
    pub message: String,
}

impl PinOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PinVerification {
    pub fn valid() -> Self {
        Self {
            valid: true,
            attempts_left: None,
            message: None,
        }
    }

    pub fn rejected() -> Self {
        Self {
            valid: false,
            attempts_left: Some(DISPLAYED_ATTEMPTS_LEFT),
            message: Some(PIN_INCORRECT.to_string()),
        }
    }
}
