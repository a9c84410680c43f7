//! Local PIN gate.
//!
//! Gates sensitive actions behind a 5-digit PIN that never leaves the device.
//! UI code wraps an action with [`PinGate::require_pin`]; the gate opens the
//! setup or verify prompt, and the UI resolves it with
//! [`PinGate::execute_pending_action`] or [`PinGate::close_modals`].
//!
//! Verification is purely local: the PIN is sealed with AES-256-GCM under a
//! key derived from the device fingerprint and stored in a key-value store.
//! The backend is consulted only as a fallback status signal and notified
//! after setup; neither call can block or fail the local flow.

pub mod outcome;
pub mod policy;
pub mod request;

pub use outcome::{PinOutcome, PinVerification};
pub use policy::{check_pin_policy, validate_pin, PinPolicyError, PinValidation};
pub use request::{GateRequest, PinPrompt};

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use zeroize::Zeroizing;

use crate::api::PinBackend;
use crate::crypto::{self, CryptoError, DeviceFingerprint};
use crate::state::{GateStatus, PinState};
use crate::storage::{KeyValueStore, SessionStore, StoreError};

/// Failure reading or writing the sealed PIN.
#[derive(Debug, Error)]
pub enum LocalPinError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Mutable gate state. Guarded by a std mutex that is never held across an await.
///
/// A prompt flag is set only while `pending` holds a request. The reverse
/// holds too, except between a successful `setup_pin` and the matching
/// execute or close, when the request waits with no prompt shown.
#[derive(Debug, Default)]
struct GateSlots {
    has_pin: bool,
    loading: u32,
    show_setup_modal: bool,
    show_verify_modal: bool,
    /// Single-slot mailbox for the request the open prompt belongs to.
    pending: Option<GateRequest>,
    /// Requests that arrived while another prompt was open.
    queue: VecDeque<GateRequest>,
}

impl GateSlots {
    fn snapshot(&self) -> PinState {
        PinState {
            has_pin: self.has_pin,
            is_loading: self.loading > 0,
            show_setup_modal: self.show_setup_modal,
            show_verify_modal: self.show_verify_modal,
            has_pending_action: self.pending.is_some(),
            queued_requests: self.queue.len(),
        }
    }

    /// Put `request` in the slot and open the prompt matching `has_pin`.
    fn open(&mut self, request: GateRequest) {
        self.pending = Some(request);
        self.show_setup_modal = !self.has_pin;
        self.show_verify_modal = self.has_pin;
    }

    fn close(&mut self) -> Option<GateRequest> {
        self.show_setup_modal = false;
        self.show_verify_modal = false;
        self.pending.take()
    }
}

/// The PIN gate. One per application shell; share it behind an `Arc`.
pub struct PinGate<B: PinBackend> {
    store: Box<dyn KeyValueStore>,
    session: SessionStore,
    backend: Arc<B>,
    storage_key: String,
    sealing_key: Zeroizing<[u8; 32]>,
    slots: Mutex<GateSlots>,
    state_tx: watch::Sender<PinState>,
}

impl<B: PinBackend> PinGate<B> {
    /// Create a gate for the device described by `fingerprint`.
    ///
    /// Starts in the no-PIN state; call [`check_pin_status`](Self::check_pin_status)
    /// to pick up an existing PIN.
    pub fn new(
        store: Box<dyn KeyValueStore>,
        backend: Arc<B>,
        fingerprint: &DeviceFingerprint,
    ) -> Result<Self, CryptoError> {
        let fingerprint_hash = fingerprint.hash();
        let sealing_key = Zeroizing::new(crypto::derive_pin_key(&fingerprint_hash)?);
        let (state_tx, _) = watch::channel(PinState::default());

        Ok(Self {
            store,
            session: SessionStore::new(),
            backend,
            storage_key: fingerprint.storage_key(),
            sealing_key,
            slots: Mutex::new(GateSlots::default()),
            state_tx,
        })
    }

    /// Current state snapshot.
    pub fn state(&self) -> PinState {
        self.lock_slots().snapshot()
    }

    pub fn status(&self) -> GateStatus {
        self.state().status()
    }

    pub fn has_pin(&self) -> bool {
        self.lock_slots().has_pin
    }

    /// Session-scoped hint that a PIN was seen during this process lifetime.
    pub fn has_pin_hint(&self) -> bool {
        self.session.has_pin_hint()
    }

    /// Receive a fresh [`PinState`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<PinState> {
        self.state_tx.subscribe()
    }

    /// Storage key of the sealed PIN for this device.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Find out whether a PIN is set.
    ///
    /// A local blob answers immediately with no network call. Otherwise the
    /// backend is asked (PINs set under the old server-side scheme); if it
    /// cannot be reached, the local check is repeated and its answer used.
    pub async fn check_pin_status(&self) -> bool {
        let _loading = self.begin_loading();

        if self.local_pin_exists() {
            self.set_has_pin(true);
            return true;
        }

        let has_pin = match self.backend.check_pin_status().await {
            Ok(has_pin) => {
                log::info!("No local PIN, backend reports has_pin={}", has_pin);
                has_pin
            }
            Err(e) => {
                if e.is_network() {
                    log::warn!("PIN status check unreachable, using local state: {}", e);
                } else {
                    log::warn!("PIN status check failed, using local state: {}", e);
                }
                self.local_pin_exists()
            }
        };

        self.set_has_pin(has_pin);
        has_pin
    }

    /// Create the device PIN.
    pub async fn setup_pin(&self, pin: &str, confirm_pin: &str) -> PinOutcome {
        if let Err(e) = check_pin_policy(pin) {
            return PinOutcome::failure(e.to_string());
        }
        if pin != confirm_pin {
            return PinOutcome::failure(outcome::PINS_DO_NOT_MATCH);
        }

        let _loading = self.begin_loading();

        if let Err(e) = self.write_pin(pin) {
            log::error!("Failed to store PIN locally: {}", e);
            return PinOutcome::failure(outcome::PIN_SETUP_FAILED);
        }

        // The setup prompt closes here; its request stays pending so the UI
        // can follow up with execute_pending_action.
        self.update_slots(|slots| {
            slots.has_pin = true;
            slots.show_setup_modal = false;
        });
        self.session.set_has_pin(true);
        self.spawn_setup_notification();

        log::info!("PIN set up on this device");
        PinOutcome::success(outcome::PIN_SETUP_SUCCESS)
    }

    /// Check `pin` against the sealed local PIN.
    ///
    /// A missing blob or a blob that does not decrypt counts as a mismatch.
    pub async fn verify_pin(&self, pin: &str) -> PinVerification {
        let _loading = self.begin_loading();

        match self.read_pin() {
            Ok(Some(stored)) if crypto::secrets_equal(&stored, pin) => PinVerification::valid(),
            Ok(Some(_)) => {
                log::info!("PIN verification failed: mismatch");
                PinVerification::rejected()
            }
            Ok(None) => {
                log::info!("PIN verification failed: no PIN on this device");
                PinVerification::rejected()
            }
            Err(e) => {
                log::warn!("PIN verification failed: {}", e);
                PinVerification::rejected()
            }
        }
    }

    /// Replace the device PIN. The current PIN must verify first.
    pub async fn change_pin(&self, current_pin: &str, new_pin: &str, confirm_pin: &str) -> PinOutcome {
        if !self.verify_pin(current_pin).await.valid {
            return PinOutcome::failure(outcome::CURRENT_PIN_INCORRECT);
        }
        if let Err(e) = check_pin_policy(new_pin) {
            return PinOutcome::failure(e.to_string());
        }
        if new_pin != confirm_pin {
            return PinOutcome::failure(outcome::PINS_DO_NOT_MATCH);
        }

        let _loading = self.begin_loading();

        if let Err(e) = self.write_pin(new_pin) {
            log::error!("Failed to overwrite local PIN: {}", e);
            return PinOutcome::failure(outcome::PIN_CHANGE_FAILED);
        }

        log::info!("PIN changed on this device");
        PinOutcome::success(outcome::PIN_CHANGE_SUCCESS)
    }

    /// Gate `action` behind the PIN.
    ///
    /// Opens the setup prompt when no PIN is set, the verify prompt otherwise.
    /// The returned [`PinPrompt`] resolves `true` once the action has run and
    /// `false` if the prompt is cancelled. A request made while another prompt
    /// is open waits in FIFO order.
    pub fn require_pin<F, Fut, E>(&self, action: F) -> PinPrompt
    where
        F: FnOnce(Option<String>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (request, prompt) = GateRequest::new(action);

        self.update_slots(|slots| {
            if slots.pending.is_none() && slots.queue.is_empty() {
                slots.open(request);
            } else {
                log::info!("PIN prompt busy, queueing request #{}", slots.queue.len() + 1);
                slots.queue.push_back(request);
            }
        });

        prompt
    }

    /// Resolve the open prompt successfully and run its action.
    ///
    /// The prompt flags are cleared before the action starts. The caller's
    /// [`PinPrompt`] resolves `true` even if the action fails.
    pub async fn execute_pending_action(&self, pin: Option<&str>) {
        let request = self.update_slots(GateSlots::close);

        match request {
            Some(request) => request.run(pin.map(str::to_string)).await,
            None => log::debug!("execute_pending_action with nothing pending"),
        }

        self.promote_next();
    }

    /// Cancel the open prompt. Its caller's [`PinPrompt`] resolves `false`.
    pub fn close_modals(&self) {
        if let Some(request) = self.update_slots(GateSlots::close) {
            log::info!("PIN prompt cancelled");
            request.cancel();
        }

        self.promote_next();
    }

    /// Delete the local PIN. No backend call.
    ///
    /// An open prompt is cancelled (its caller gets `false`); the next
    /// queued request, if any, is then offered the setup prompt.
    pub fn clear_pin(&self) -> Result<(), StoreError> {
        self.store.remove(&self.storage_key)?;

        let cancelled = self.update_slots(|slots| {
            slots.has_pin = false;
            slots.close()
        });
        self.session.set_has_pin(false);
        if let Some(request) = cancelled {
            log::info!("PIN prompt cancelled by clear_pin");
            request.cancel();
        }
        self.promote_next();

        log::info!("Local PIN cleared");
        Ok(())
    }

    fn lock_slots(&self) -> MutexGuard<'_, GateSlots> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutate the slots and publish the resulting snapshot.
    fn update_slots<R>(&self, f: impl FnOnce(&mut GateSlots) -> R) -> R {
        let (result, snapshot) = {
            let mut slots = self.lock_slots();
            let result = f(&mut slots);
            (result, slots.snapshot())
        };
        self.state_tx.send_replace(snapshot);
        result
    }

    fn set_has_pin(&self, has_pin: bool) {
        self.update_slots(|slots| slots.has_pin = has_pin);
        self.session.set_has_pin(has_pin);
    }

    fn promote_next(&self) {
        self.update_slots(|slots| {
            if slots.pending.is_none() {
                if let Some(next) = slots.queue.pop_front() {
                    slots.open(next);
                }
            }
        });
    }

    fn begin_loading(&self) -> LoadingGuard<'_, B> {
        self.update_slots(|slots| slots.loading += 1);
        LoadingGuard { gate: self }
    }

    fn local_pin_exists(&self) -> bool {
        match self.store.contains(&self.storage_key) {
            Ok(exists) => exists,
            Err(e) => {
                log::warn!("Local PIN lookup failed, treating as absent: {}", e);
                false
            }
        }
    }

    fn read_pin(&self) -> Result<Option<Zeroizing<String>>, LocalPinError> {
        match self.store.get(&self.storage_key)? {
            Some(envelope) => Ok(Some(crypto::open_pin(&envelope, &self.sealing_key)?)),
            None => Ok(None),
        }
    }

    fn write_pin(&self, pin: &str) -> Result<(), LocalPinError> {
        let envelope = crypto::seal_pin(pin, &self.sealing_key)?;
        self.store.set(&self.storage_key, &envelope)?;
        Ok(())
    }

    /// Best-effort server bookkeeping. Never awaited by the caller.
    fn spawn_setup_notification(&self) {
        let backend = Arc::clone(&self.backend);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match backend.notify_pin_setup().await {
                        Ok(()) => log::debug!("Backend notified of PIN setup"),
                        Err(e) => log::warn!("PIN setup notification failed (local PIN kept): {}", e),
                    }
                });
            }
            Err(_) => log::warn!("No async runtime, skipping PIN setup notification"),
        }
    }
}

/// Keeps `is_loading` set for as long as it lives.
struct LoadingGuard<'a, B: PinBackend> {
    gate: &'a PinGate<B>,
}

impl<B: PinBackend> Drop for LoadingGuard<'_, B> {
    fn drop(&mut self) {
        self.gate
            .update_slots(|slots| slots.loading = slots.loading.saturating_sub(1));
    }
}
