//! Local PIN gate for sensitive in-app actions.
//!
//! A 5-digit PIN, sealed on the device and verified locally, authorizes
//! actions such as confirming a payment. The user-service is only a fallback
//! status source and is told when a PIN is set up; the PIN never leaves the
//! device.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pin_gate::{api::ApiClient, crypto::DeviceFingerprint, storage::MemoryStore, PinGate};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fingerprint = DeviceFingerprint::detect(Some("fr-FR"), Some((412, 915)));
//! let gate = PinGate::new(
//!     Box::new(MemoryStore::new()),
//!     Arc::new(ApiClient::new("http://localhost:3000")),
//!     &fingerprint,
//! )?;
//!
//! gate.check_pin_status().await;
//! let prompt = gate.require_pin(|pin| async move {
//!     println!("paying with PIN confirmation: {}", pin.is_some());
//!     Ok::<(), String>(())
//! });
//! // ...the UI collects the PIN, then:
//! if gate.verify_pin("13579").await.valid {
//!     gate.execute_pending_action(Some("13579")).await;
//! } else {
//!     gate.close_modals();
//! }
//! let authorized = prompt.await;
//! # let _ = authorized;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod crypto;
pub mod pin;
pub mod state;
pub mod storage;

pub use pin::{validate_pin, PinGate, PinOutcome, PinPrompt, PinValidation, PinVerification};
pub use state::{GateStatus, PinState};
