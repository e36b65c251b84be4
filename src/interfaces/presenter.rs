//! # Presentation Layer
//!
//! The pipeline never renders anything itself. It reports each outcome to a
//! [`Presenter`] exactly once and asks the presenter for the yes/no answer at
//! the confirmation gate.
//!
//! Two implementations ship with the crate:
//!
//! - [`TracingPresenter`]: logs outcomes and answers every confirmation with a
//!   fixed policy. Suited to batch callers and the command-line tools.
//! - [`ChannelPresenter`]: forwards every interaction as a
//!   [`PresentationEvent`] over an mpsc channel so an interactive front end
//!   (or a test) can render it and reply through a oneshot.

use crate::error::ErrorKind;
use crate::models::CommandResult;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present_error(&self, kind: ErrorKind, message: &str);

    async fn present_success(&self, result: &CommandResult);

    /// Suspend until the user answers `prompt`; `true` means proceed
    async fn request_confirmation(&self, prompt: &str) -> bool;
}

/// Presenter that writes outcomes to the tracing subscriber
#[derive(Debug, Clone, Copy)]
pub struct TracingPresenter {
    auto_confirm: bool,
}

impl TracingPresenter {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }

    pub fn confirming() -> Self {
        Self::new(true)
    }

    pub fn declining() -> Self {
        Self::new(false)
    }
}

impl Default for TracingPresenter {
    fn default() -> Self {
        Self::confirming()
    }
}

#[async_trait]
impl Presenter for TracingPresenter {
    async fn present_error(&self, kind: ErrorKind, message: &str) {
        warn!(error_kind = %kind, message = message, "❌ Command failed");
    }

    async fn present_success(&self, result: &CommandResult) {
        info!(
            message = %result.message,
            produced_id = result.produced_id.as_deref(),
            "✅ Command succeeded"
        );
    }

    async fn request_confirmation(&self, prompt: &str) -> bool {
        debug!(prompt = prompt, answer = self.auto_confirm, "Confirmation answered by policy");
        self.auto_confirm
    }
}

/// One interaction forwarded by [`ChannelPresenter`]
#[derive(Debug)]
pub enum PresentationEvent {
    Error {
        kind: ErrorKind,
        message: String,
    },
    Success(CommandResult),
    Confirm {
        prompt: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Presenter that hands every interaction to a front end over a channel.
///
/// A confirmation whose reply sender is dropped, or sent after the receiving
/// side has gone away, counts as a "no".
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    events: mpsc::Sender<PresentationEvent>,
}

impl ChannelPresenter {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PresentationEvent>) {
        let (events, receiver) = mpsc::channel(buffer.max(1));
        (Self { events }, receiver)
    }

    async fn forward(&self, event: PresentationEvent) -> bool {
        if self.events.send(event).await.is_err() {
            debug!("Presentation receiver closed, event dropped");
            return false;
        }
        true
    }
}

#[async_trait]
impl Presenter for ChannelPresenter {
    async fn present_error(&self, kind: ErrorKind, message: &str) {
        self.forward(PresentationEvent::Error {
            kind,
            message: message.to_string(),
        })
        .await;
    }

    async fn present_success(&self, result: &CommandResult) {
        self.forward(PresentationEvent::Success(result.clone())).await;
    }

    async fn request_confirmation(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let sent = self
            .forward(PresentationEvent::Confirm {
                prompt: prompt.to_string(),
                reply,
            })
            .await;
        if !sent {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}
