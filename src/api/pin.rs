//! User-service PIN endpoints.
//!
//! The gate only uses these as a fallback status signal and for bookkeeping.
//! Verification never goes through the backend.

use std::future::Future;

use thiserror::Error;

use super::client::ApiClient;
use super::types::{PinSetupNotification, PinStatusResponse};

const PIN_STATUS_PATH: &str = "/users/pin/status";
const PIN_SETUP_PATH: &str = "/users/pin/setup";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("No backend configured")]
    Offline,
}

impl ApiError {
    /// Whether the failure looks like missing connectivity rather than a
    /// server-side rejection.
    pub fn is_network(&self) -> bool {
        match self {
            ApiError::Request(e) => e.is_connect() || e.is_timeout(),
            ApiError::Offline => true,
            ApiError::Status { .. } => false,
        }
    }
}

/// Backend operations the gate depends on.
///
/// In production `ApiClient` implements this over HTTP. In tests, a mock
/// implementation controls success/failure behavior.
pub trait PinBackend: Send + Sync + 'static {
    /// Ask the server whether the user has a PIN on record.
    fn check_pin_status(&self) -> impl Future<Output = Result<bool, ApiError>> + Send;

    /// Tell the server a PIN was set up on this device.
    fn notify_pin_setup(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// GET /users/pin/status -> `{ "has_pin": bool }`
pub async fn check_pin_status(client: &ApiClient) -> Result<bool, ApiError> {
    let resp = client.authenticated_get(PIN_STATUS_PATH).await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }

    let status: PinStatusResponse = resp.json().await?;
    Ok(status.has_pin)
}

/// POST /users/pin/setup. Any 2xx counts as acknowledged; the body is ignored.
pub async fn notify_pin_setup(client: &ApiClient) -> Result<(), ApiError> {
    let resp = client
        .authenticated_post(PIN_SETUP_PATH, &PinSetupNotification::default())
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }

    Ok(())
}

impl PinBackend for ApiClient {
    async fn check_pin_status(&self) -> Result<bool, ApiError> {
        check_pin_status(self).await
    }

    async fn notify_pin_setup(&self) -> Result<(), ApiError> {
        notify_pin_setup(self).await
    }
}

/// Backend used when no API is configured. Every call fails with
/// [`ApiError::Offline`], which the gate treats like an unreachable server.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

impl PinBackend for OfflineBackend {
    async fn check_pin_status(&self) -> Result<bool, ApiError> {
        Err(ApiError::Offline)
    }

    async fn notify_pin_setup(&self) -> Result<(), ApiError> {
        Err(ApiError::Offline)
    }
}
