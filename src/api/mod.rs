//! API client module for the user-service behind the gateway.
//!
//! Provides the HTTP client with auth header injection, the PIN status and
//! setup-notification calls, and the `PinBackend` seam used by the gate.

pub mod client;
pub mod pin;
pub mod types;

pub use client::ApiClient;
pub use pin::{ApiError, OfflineBackend, PinBackend};
