use async_trait::async_trait;
use cmdgate_core::error::ErrorKind;
use cmdgate_core::interfaces::Presenter;
use cmdgate_core::models::CommandResult;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

type ConfirmationHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    Error(ErrorKind, String),
    Success(CommandResult),
    Prompt(String),
}

/// Presenter that records every interaction and answers prompts with a fixed policy
pub struct RecordingPresenter {
    confirm: bool,
    events: Mutex<Vec<Presented>>,
    on_confirmation: Mutex<Option<ConfirmationHook>>,
}

impl RecordingPresenter {
    pub fn new(confirm: bool) -> Self {
        Self {
            confirm,
            events: Mutex::new(Vec::new()),
            on_confirmation: Mutex::new(None),
        }
    }

    /// Run `hook` while the user is being asked, before the answer is returned
    pub fn on_confirmation<F, Fut>(&self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *self.on_confirmation.lock() = Some(Arc::new(move || hook().boxed()));
    }

    pub fn events(&self) -> Vec<Presented> {
        self.events.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Presented::Prompt(prompt) => Some(prompt.clone()),
                _ => None,
            })
            .collect()
    }

    /// Outcomes only, prompts excluded
    pub fn outcomes(&self) -> Vec<Presented> {
        self.events
            .lock()
            .iter()
            .filter(|event| !matches!(event, Presented::Prompt(_)))
            .cloned()
            .collect()
    }

    pub fn errors_of(&self, kind: ErrorKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, Presented::Error(k, _) if *k == kind))
            .count()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn present_error(&self, kind: ErrorKind, message: &str) {
        self.events
            .lock()
            .push(Presented::Error(kind, message.to_string()));
    }

    async fn present_success(&self, result: &CommandResult) {
        self.events.lock().push(Presented::Success(result.clone()));
    }

    async fn request_confirmation(&self, prompt: &str) -> bool {
        self.events.lock().push(Presented::Prompt(prompt.to_string()));
        let hook = self.on_confirmation.lock().clone();
        if let Some(hook) = hook {
            hook().await;
        }
        self.confirm
    }
}
