//! Session-scoped hints.
//!
//! Lives in process memory only and disappears with the session. The
//! `has_pin` hint lets a UI render the right prompt before the status check
//! finishes; it is never consulted for authorization.

use super::{KeyValueStore, MemoryStore};

const HAS_PIN_KEY: &str = "has_pin";

#[derive(Debug, Default)]
pub struct SessionStore {
    inner: MemoryStore,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_has_pin(&self, has_pin: bool) {
        // MemoryStore never fails.
        let _ = if has_pin {
            self.inner.set(HAS_PIN_KEY, "true")
        } else {
            self.inner.remove(HAS_PIN_KEY)
        };
    }

    /// `true` only when this session has already seen a PIN.
    pub fn has_pin_hint(&self) -> bool {
        matches!(self.inner.get(HAS_PIN_KEY), Ok(Some(v)) if v == "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_lifecycle() {
        let session = SessionStore::new();
        assert!(!session.has_pin_hint());
        session.set_has_pin(true);
        assert!(session.has_pin_hint());
        session.set_has_pin(false);
        assert!(!session.has_pin_hint());
    }
}
