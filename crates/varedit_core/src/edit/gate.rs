//! Discard-confirmation protocol.
//!
//! # Responsibility
//! - Present one modal per request through a `ConfirmationSurface`.
//! - Turn the modal's accept/decline into exactly one `Decision`.
//!
//! # Invariants
//! - Every request resolves exactly once.
//! - A request that loses its modal (responder dropped, gate aborted or
//!   dropped) resolves as `DiscardCancelled`.
//! - At most one request is awaiting a user decision per gate.

use futures::channel::oneshot;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

/// Outcome of one discard-confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    DiscardConfirmed,
    DiscardCancelled,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DiscardConfirmed => "discard_confirmed",
            Self::DiscardCancelled => "discard_cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingUserDecision,
}

type DecisionSlot = Arc<Mutex<Option<oneshot::Sender<Decision>>>>;

fn take_sender(slot: &DecisionSlot) -> Option<oneshot::Sender<Decision>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn slot_is_open(slot: &DecisionSlot) -> bool {
    slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
}

/// The two modal actions of one pending request.
///
/// Dropping the responder without answering resolves the request as
/// `DiscardCancelled`.
#[derive(Debug)]
pub struct DecisionResponder {
    slot: DecisionSlot,
}

impl DecisionResponder {
    /// "Discard changes" action.
    pub fn confirm(self) -> bool {
        self.respond(Decision::DiscardConfirmed)
    }

    /// "Cancel" action; keeps the editor open.
    pub fn decline(self) -> bool {
        self.respond(Decision::DiscardCancelled)
    }

    /// Delivers `decision`; returns `false` when the request was already
    /// resolved elsewhere (for example by a session teardown).
    pub fn respond(self, decision: Decision) -> bool {
        match take_sender(&self.slot) {
            Some(sender) => sender.send(decision).is_ok(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        slot_is_open(&self.slot)
    }
}

impl Drop for DecisionResponder {
    fn drop(&mut self) {
        if let Some(sender) = take_sender(&self.slot) {
            let _ = sender.send(Decision::DiscardCancelled);
        }
    }
}

/// Modal content handed to the confirmation surface.
#[derive(Debug)]
pub struct DiscardPrompt {
    /// Literal description rendered in the modal body.
    pub description: String,
    pub responder: DecisionResponder,
}

/// UI surface able to show the discard-confirmation modal.
pub trait ConfirmationSurface: Send + Sync {
    /// Shows the modal. The surface closes it itself after either action.
    fn present(&self, prompt: DiscardPrompt);

    /// Closes a modal whose request was resolved without user action.
    fn dismiss(&self) {}
}

/// Decision of one request, as a future.
///
/// Sync callers poll it with `try_decision` instead of awaiting it.
#[derive(Debug)]
pub struct PendingDecision {
    receiver: oneshot::Receiver<Decision>,
    resolved: Option<Decision>,
}

impl PendingDecision {
    fn new(receiver: oneshot::Receiver<Decision>) -> Self {
        Self {
            receiver,
            resolved: None,
        }
    }

    /// Returns the decision if it is available without waiting.
    pub fn try_decision(&mut self) -> Option<Decision> {
        if self.resolved.is_none() {
            self.resolved = match self.receiver.try_recv() {
                Ok(Some(decision)) => Some(decision),
                Ok(None) => None,
                Err(oneshot::Canceled) => Some(Decision::DiscardCancelled),
            };
        }
        self.resolved
    }
}

impl Future for PendingDecision {
    type Output = Decision;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(decision) = self.resolved {
            return Poll::Ready(decision);
        }
        let decision = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(decision)) => decision,
            Poll::Ready(Err(oneshot::Canceled)) => Decision::DiscardCancelled,
            Poll::Pending => return Poll::Pending,
        };
        self.resolved = Some(decision);
        Poll::Ready(decision)
    }
}

/// Single-request-at-a-time confirmation gate.
pub struct DiscardConfirmationGate {
    surface: Arc<dyn ConfirmationSurface>,
    slot: Option<DecisionSlot>,
}

impl DiscardConfirmationGate {
    pub fn new(surface: Arc<dyn ConfirmationSurface>) -> Self {
        Self {
            surface,
            slot: None,
        }
    }

    pub fn state(&self) -> GateState {
        match &self.slot {
            Some(slot) if slot_is_open(slot) => GateState::AwaitingUserDecision,
            _ => GateState::Idle,
        }
    }

    /// Presents the modal with `description` and returns its decision.
    ///
    /// # Errors
    /// - `GateError::AlreadyAwaiting` while a previous request is unanswered.
    pub fn request(&mut self, description: &str) -> Result<PendingDecision, GateError> {
        if self.state() == GateState::AwaitingUserDecision {
            return Err(GateError::AlreadyAwaiting);
        }

        let (sender, receiver) = oneshot::channel();
        let slot: DecisionSlot = Arc::new(Mutex::new(Some(sender)));
        self.slot = Some(Arc::clone(&slot));

        info!("event=discard_confirmation_requested module=gate status=pending");
        self.surface.present(DiscardPrompt {
            description: description.to_string(),
            responder: DecisionResponder { slot },
        });

        Ok(PendingDecision::new(receiver))
    }

    /// Resolves an unanswered request as `DiscardCancelled` and dismisses its
    /// modal. Returns whether a request was pending.
    pub fn abort(&mut self) -> bool {
        let Some(slot) = self.slot.take() else {
            return false;
        };
        let Some(sender) = take_sender(&slot) else {
            return false;
        };

        let _ = sender.send(Decision::DiscardCancelled);
        self.surface.dismiss();
        warn!("event=discard_confirmation_aborted module=gate status=cancelled");
        true
    }

    /// Records `decision` for a request answered outside its responder and
    /// returns the gate to `Idle`, closing the modal if it is still shown.
    /// Returns whether the modal was still open.
    pub fn settle(&mut self, decision: Decision) -> bool {
        let Some(slot) = self.slot.take() else {
            return false;
        };
        let Some(sender) = take_sender(&slot) else {
            return false;
        };

        let _ = sender.send(decision);
        self.surface.dismiss();
        info!(
            "event=discard_confirmation_settled module=gate status=ok decision={}",
            decision.as_str()
        );
        true
    }
}

impl Drop for DiscardConfirmationGate {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Gate misuse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    AlreadyAwaiting,
}

impl Display for GateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyAwaiting => {
                write!(f, "a discard confirmation is already awaiting a decision")
            }
        }
    }
}

impl Error for GateError {}
