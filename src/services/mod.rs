use crate::error::PollError;
use async_trait::async_trait;
use log::{error, info};

/// Asks the user to confirm an action.
#[async_trait]
pub trait PromptService: Send + Sync {
    async fn open(&self, title: &str, body: &str) -> bool;
}

/// Shared channel for surfacing failures. Fire-and-forget, must not panic.
pub trait ErrorReporter: Send + Sync {
    fn raise_error(&self, error: &PollError);
}

/// Opens the edit dialog for a poll.
pub trait PollDialog<P>: Send + Sync {
    fn open_dialog(&self, poll: &P);
}

/// Answers every prompt with the same value, for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompt {
    pub answer: bool,
}

#[async_trait]
impl PromptService for AutoPrompt {
    async fn open(&self, title: &str, body: &str) -> bool {
        info!("{}: {} -> {}", title, body, if self.answer { "yes" } else { "no" });
        self.answer
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn raise_error(&self, error: &PollError) {
        error!("{}", error);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDialog;

impl<P> PollDialog<P> for NoDialog {
    fn open_dialog(&self, _poll: &P) {
        info!("Poll dialog requested but no dialog is attached");
    }
}
