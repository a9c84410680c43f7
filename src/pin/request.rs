//! Gate requests and the prompt future handed back to callers.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Boxed future of a protected action.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// A protected action. Receives the PIN the user entered, if any.
pub type PendingAction = Box<dyn FnOnce(Option<String>) -> ActionFuture + Send>;

/// One call to `require_pin`: the action plus the channel that answers the caller.
pub struct GateRequest {
    action: PendingAction,
    responder: oneshot::Sender<bool>,
}

impl GateRequest {
    pub(crate) fn new<F, Fut, E>(action: F) -> (Self, PinPrompt)
    where
        F: FnOnce(Option<String>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (responder, rx) = oneshot::channel();
        let action: PendingAction = Box::new(move |pin: Option<String>| -> ActionFuture {
            Box::pin(async move { action(pin).await.map_err(|e| e.to_string()) })
        });
        (Self { action, responder }, PinPrompt { rx })
    }

    /// Run the action and report `true` to the caller whatever the action returns.
    ///
    /// The action runs on its own task so a panic inside it is contained.
    pub(crate) async fn run(self, pin: Option<String>) {
        let GateRequest { action, responder } = self;

        match tokio::spawn(action(pin)).await {
            Ok(Ok(())) => log::debug!("Protected action completed"),
            Ok(Err(e)) => log::error!("Protected action failed: {}", e),
            Err(e) => log::error!("Protected action aborted: {}", e),
        }

        if responder.send(true).is_err() {
            log::debug!("PIN prompt caller went away before resolution");
        }
    }

    /// Resolve the caller with `false` without running the action.
    pub(crate) fn cancel(self) {
        if self.responder.send(false).is_err() {
            log::debug!("PIN prompt caller went away before cancellation");
        }
    }
}

impl std::fmt::Debug for GateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateRequest").finish_non_exhaustive()
    }
}

/// Future returned by `require_pin`.
///
/// Resolves `true` once the gate ran the action, `false` on cancellation.
/// If the gate is dropped with the request still pending it also resolves
/// `false`, so callers never wait forever on a torn-down gate.
#[must_use = "the prompt resolves only when awaited"]
#[derive(Debug)]
pub struct PinPrompt {
    rx: oneshot::Receiver<bool>,
}

impl Future for PinPrompt {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(false))
    }
}
