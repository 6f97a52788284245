//! Seams to the host UI: questions put to the user and fire-and-forget
//! notices. The controller presents a prompt and keeps running; the host
//! answers later through `TimerController::answer_resume_prompt` or
//! `TimerController::resolve_reset`.

use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PromptKind {
    /// The app came back to the foreground with a paused session.
    ResumeAfterReturn,
    /// Reset was pressed during an active session.
    SaveOrDiscard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ResetChoice {
    Discard,
    Save,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
    pub options: Vec<String>,
}

impl Prompt {
    pub fn resume_after_return() -> Self {
        Self {
            kind: PromptKind::ResumeAfterReturn,
            title: "Welcome back!".into(),
            message: "The timer was paused. Do you want to continue?".into(),
            options: vec!["No".into(), "Continue".into()],
        }
    }

    pub fn save_or_discard() -> Self {
        Self {
            kind: PromptKind::SaveOrDiscard,
            title: "Save session?".into(),
            message: "The session is not finished yet. Save the progress so far?".into(),
            options: vec!["Discard".into(), "Save".into()],
        }
    }
}

pub trait Prompter: Send + Sync {
    fn present(&self, prompt: Prompt);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Writes notices to the log; used when the host has nothing better.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!("{title}: {body}");
    }
}

impl Prompter for LogNotifier {
    fn present(&self, prompt: Prompt) {
        info!(
            "{}: {} [{}]",
            prompt.title,
            prompt.message,
            prompt.options.join(" / ")
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures everything shown to the user.
    #[derive(Default)]
    pub struct RecordingHost {
        pub prompts: Mutex<Vec<Prompt>>,
        pub notices: Mutex<Vec<(String, String)>>,
    }

    impl RecordingHost {
        pub fn prompt_kinds(&self) -> Vec<PromptKind> {
            self.prompts.lock().unwrap().iter().map(|p| p.kind).collect()
        }

        pub fn notice_titles(&self) -> Vec<String> {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .map(|(title, _)| title.clone())
                .collect()
        }
    }

    impl Prompter for RecordingHost {
        fn present(&self, prompt: Prompt) {
            self.prompts.lock().unwrap().push(prompt);
        }
    }

    impl Notifier for RecordingHost {
        fn notify(&self, title: &str, body: &str) {
            self.notices
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }
}
