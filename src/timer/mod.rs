pub mod controller;
pub mod interaction;
pub mod state;

pub use controller::{ResetOutcome, SessionEnd, TimerConfig, TimerController, TimerSnapshot};
pub use interaction::{LogNotifier, Notifier, Prompt, PromptKind, Prompter, ResetChoice};
pub use state::{format_clock, TickOutcome, TimerState, TimerStatus};
