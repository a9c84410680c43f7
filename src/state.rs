//! Observable gate state.
//!
//! `PinState` is the snapshot a UI renders from (prompt visibility, loading
//! spinner). `GateStatus` collapses it into the four states of the gate.

use serde::Serialize;

/// Snapshot of the gate, published on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinState {
    /// Whether a PIN is known to be set for this device.
    pub has_pin: bool,
    /// True while a status check, setup, change or verification is in flight.
    pub is_loading: bool,
    /// The "create your PIN" prompt should be shown.
    pub show_setup_modal: bool,
    /// The "enter your PIN" prompt should be shown.
    pub show_verify_modal: bool,
    /// An action is waiting for the current prompt to resolve.
    pub has_pending_action: bool,
    /// Requests waiting behind the current prompt.
    pub queued_requests: usize,
}

impl PinState {
    pub fn status(&self) -> GateStatus {
        if self.show_setup_modal {
            GateStatus::AwaitingSetup
        } else if self.show_verify_modal {
            GateStatus::AwaitingVerify
        } else if self.has_pin {
            GateStatus::HasPin
        } else {
            GateStatus::NoPin
        }
    }
}

/// The four states of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GateStatus {
    /// No PIN on this device. Initial state.
    NoPin,
    /// A PIN is set and no prompt is open.
    HasPin,
    /// Setup prompt open with an action waiting.
    AwaitingSetup,
    /// Verify prompt open with an action waiting.
    AwaitingVerify,
}

impl GateStatus {
    /// Human-readable status text.
    pub fn label(&self) -> &'static str {
        match self {
            GateStatus::NoPin => "No PIN",
            GateStatus::HasPin => "PIN set",
            GateStatus::AwaitingSetup => "Waiting for PIN setup",
            GateStatus::AwaitingVerify => "Waiting for PIN",
        }
    }

    /// Whether a prompt is open.
    pub fn is_prompting(&self) -> bool {
        matches!(self, GateStatus::AwaitingSetup | GateStatus::AwaitingVerify)
    }
}
