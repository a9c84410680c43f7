//! Request and response types for the user-service PIN endpoints.

use serde::{Deserialize, Serialize};

/// Response from GET /users/pin/status.
///
/// The service answers in snake_case; older gateway builds used camelCase.
#[derive(Debug, Clone, Deserialize)]
pub struct PinStatusResponse {
    #[serde(alias = "hasPin")]
    pub has_pin: bool,
}

/// Body of POST /users/pin/setup.
///
/// Bookkeeping only: the PIN itself never leaves the device.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinSetupNotification {
    /// Where the PIN lives. Always `"device"` for this client.
    pub storage: &'static str,
}

impl Default for PinSetupNotification {
    fn default() -> Self {
        Self { storage: "device" }
    }
}
