//! PIN complexity rules.
//!
//! A PIN is exactly five ASCII digits, not all the same digit, and not one
//! of the twelve straight runs up or down.

use serde::Serialize;
use thiserror::Error;

/// Required PIN length.
pub const PIN_LENGTH: usize = 5;

/// Ascending and descending runs rejected as too simple.
pub const FORBIDDEN_SEQUENCES: [&str; 12] = [
    "01234", "12345", "23456", "34567", "45678", "56789", "98765", "87654", "76543", "65432",
    "54321", "43210",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PinPolicyError {
    #[error("Le code PIN doit contenir exactement 5 chiffres")]
    WrongFormat,
    #[error("Code PIN trop simple (répétition de chiffres)")]
    Repetition,
    #[error("Code PIN trop simple (suite logique)")]
    Sequence,
}

/// Check a candidate PIN. Rules are applied in order and the first failure wins.
pub fn check_pin_policy(pin: &str) -> Result<(), PinPolicyError> {
    let bytes = pin.as_bytes();
    if bytes.len() != PIN_LENGTH || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(PinPolicyError::WrongFormat);
    }

    if bytes.iter().all(|&b| b == bytes[0]) {
        return Err(PinPolicyError::Repetition);
    }

    if FORBIDDEN_SEQUENCES.contains(&pin) {
        return Err(PinPolicyError::Sequence);
    }

    Ok(())
}

/// Result of [`validate_pin`], ready to show in a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Result<(), PinPolicyError>> for PinValidation {
    fn from(result: Result<(), PinPolicyError>) -> Self {
        match result {
            Ok(()) => PinValidation {
                valid: true,
                message: None,
            },
            Err(e) => PinValidation {
                valid: false,
                message: Some(e.to_string()),
            },
        }
    }
}

/// Validate a PIN without side effects.
pub fn validate_pin(pin: &str) -> PinValidation {
    check_pin_policy(pin).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(pin: &str) -> String {
        validate_pin(pin).message.unwrap_or_default()
    }

    #[test]
    fn test_documented_examples() {
        let rep = validate_pin("11111");
        assert!(!rep.valid);
        assert!(rep.message.unwrap().contains("répétition"));

        assert_eq!(
            validate_pin("13579"),
            PinValidation {
                valid: true,
                message: None
            }
        );

        let seq = validate_pin("12345");
        assert!(!seq.valid);
        assert!(seq.message.unwrap().contains("suite logique"));

        let short = validate_pin("482");
        assert!(!short.valid);
        assert!(short.message.unwrap().contains("5 chiffres"));
    }

    #[test]
    fn test_wrong_format_inputs() {
        for pin in ["", "1234", "123456", "12a45", " 1357", "1357 ", "１２３４５", "-1357", "13.57"] {
            assert_eq!(
                check_pin_policy(pin),
                Err(PinPolicyError::WrongFormat),
                "input {:?}",
                pin
            );
            assert!(message(pin).contains("5 chiffres"));
        }
    }

    #[test]
    fn test_every_sequence_rejected() {
        for seq in FORBIDDEN_SEQUENCES {
            assert_eq!(check_pin_policy(seq), Err(PinPolicyError::Sequence), "{}", seq);
        }
    }

    #[test]
    fn test_every_repetition_rejected() {
        for d in '0'..='9' {
            let pin: String = std::iter::repeat(d).take(PIN_LENGTH).collect();
            assert_eq!(check_pin_policy(&pin), Err(PinPolicyError::Repetition));
        }
    }

    #[test]
    fn test_exhaustive_five_digit_space() {
        let mut rejected = 0;
        for n in 0..100_000u32 {
            let pin = format!("{:05}", n);
            let bytes = pin.as_bytes();
            let all_same = bytes.iter().all(|&b| b == bytes[0]);
            let is_sequence = FORBIDDEN_SEQUENCES.contains(&pin.as_str());

            let valid = validate_pin(&pin).valid;
            assert_eq!(valid, !(all_same || is_sequence), "{}", pin);
            if !valid {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 10 + 12);
    }

    #[test]
    fn test_near_misses_are_valid() {
        for pin in ["12346", "01235", "11112", "98764", "24680", "10000"] {
            assert!(validate_pin(pin).valid, "{}", pin);
        }
    }

    #[test]
    fn test_validation_serializes_without_null_message() {
        let json = serde_json::to_string(&validate_pin("13579")).unwrap();
        assert_eq!(json, r#"{"valid":true}"#);
    }
}
