use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{NewSessionRecord, SessionStatus, SessionStore},
    lifecycle::{self, AppLifecycle, LifecycleEffect},
};

use super::{
    interaction::{Notifier, Prompt, PromptKind, Prompter, ResetChoice},
    state::{format_clock, TickOutcome, TimerState, TimerStatus, DEFAULT_TARGET_MINUTES},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone)]
pub struct TimerConfig {
    pub target_minutes: u32,
    pub category: String,
    pub tick_interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            target_minutes: DEFAULT_TARGET_MINUTES,
            category: String::new(),
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl TimerConfig {
    /// `FOCUS_TIMER_DEBUG=1` runs the countdown twenty times faster.
    pub fn from_env(target_minutes: u32, category: impl Into<String>) -> Self {
        let debug_mode = std::env::var("FOCUS_TIMER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            target_minutes,
            category: category.into(),
            tick_interval: if debug_mode {
                Duration::from_millis(50)
            } else {
                Duration::from_secs(1)
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub is_running: bool,
    pub is_session_active: bool,
    pub pending_prompt: Option<PromptKind>,
    pub clock: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// No session was active; the countdown went back to the target.
    Cleared,
    /// The save-or-discard prompt is up and the countdown is frozen.
    AwaitingChoice,
    /// A session is being finalized; nothing to reset.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Discarded,
    Saved { id: i64, record: NewSessionRecord },
    /// The store rejected the write; the session is gone regardless.
    NotSaved { record: NewSessionRecord },
}

struct Inner {
    state: TimerState,
    pending_prompt: Option<PromptKind>,
}

impl Inner {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state.clone(),
            is_running: self.state.is_running(),
            is_session_active: self.state.is_session_active(),
            pending_prompt: self.pending_prompt,
            clock: format_clock(self.state.remaining_secs),
        }
    }
}

struct BackgroundTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl BackgroundTask {
    /// Signals the task to stop without waiting. The task may be the caller.
    fn stop(self) {
        self.cancel.cancel();
        drop(self.handle);
    }
}

/// Single writer of the timer state. Clones share everything; other parts
/// of the app observe changes through [`TimerController::subscribe`].
#[derive(Clone)]
pub struct TimerController {
    inner: Arc<Mutex<Inner>>,
    store: SessionStore,
    prompter: Arc<dyn Prompter>,
    notifier: Arc<dyn Notifier>,
    ticker: Arc<Mutex<Option<BackgroundTask>>>,
    monitor: Arc<Mutex<Option<BackgroundTask>>>,
    tick_interval: Duration,
    snapshot_tx: Arc<watch::Sender<TimerSnapshot>>,
}

impl TimerController {
    pub fn new(
        store: SessionStore,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
        config: TimerConfig,
    ) -> Self {
        let inner = Inner {
            state: TimerState::new(config.target_minutes, config.category),
            pending_prompt: None,
        };
        let (snapshot_tx, _) = watch::channel(inner.snapshot());

        Self {
            inner: Arc::new(Mutex::new(inner)),
            store,
            prompter,
            notifier,
            ticker: Arc::new(Mutex::new(None)),
            monitor: Arc::new(Mutex::new(None)),
            tick_interval: config.tick_interval,
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn start(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.state.start() {
            return false;
        }
        log_info!(
            "Session started: {} for {} min",
            inner.state.selected_category,
            inner.state.target_minutes
        );
        self.spawn_ticker().await;
        self.publish(&inner);
        true
    }

    pub async fn pause(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.state.pause() {
            return false;
        }
        self.cancel_ticker().await;
        self.publish(&inner);
        true
    }

    /// Rejected while the save-or-discard prompt is waiting for an answer.
    pub async fn resume(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.pending_prompt == Some(PromptKind::SaveOrDiscard) || !inner.state.resume() {
            return false;
        }
        if inner.pending_prompt == Some(PromptKind::ResumeAfterReturn) {
            inner.pending_prompt = None;
        }
        self.spawn_ticker().await;
        self.publish(&inner);
        true
    }

    /// Start, pause or resume depending on the current status.
    pub async fn toggle(&self) -> bool {
        let status = self.inner.lock().await.state.status;
        match status {
            TimerStatus::Idle => self.start().await,
            TimerStatus::Running => self.pause().await,
            TimerStatus::Paused => self.resume().await,
            TimerStatus::Finalizing => false,
        }
    }

    pub async fn adjust_target(&self, delta_minutes: i32) -> bool {
        let mut inner = self.inner.lock().await;
        let applied = inner.state.adjust_target(delta_minutes);
        if applied {
            self.publish(&inner);
        }
        applied
    }

    pub async fn select_category(&self, category: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let applied = inner.state.select_category(category);
        if applied {
            self.publish(&inner);
        }
        applied
    }

    pub async fn reset(&self) -> ResetOutcome {
        let mut inner = self.inner.lock().await;
        match inner.state.status {
            TimerStatus::Idle => {
                inner.state.reset_to_idle();
                self.publish(&inner);
                ResetOutcome::Cleared
            }
            TimerStatus::Finalizing => ResetOutcome::Ignored,
            TimerStatus::Running | TimerStatus::Paused => {
                if inner.state.pause() {
                    self.cancel_ticker().await;
                }
                inner.pending_prompt = Some(PromptKind::SaveOrDiscard);
                self.publish(&inner);
                self.prompter.present(Prompt::save_or_discard());
                ResetOutcome::AwaitingChoice
            }
        }
    }

    /// Applies the answer to the save-or-discard prompt. `None` when no such
    /// prompt is pending.
    pub async fn resolve_reset(&self, choice: ResetChoice) -> Option<SessionEnd> {
        {
            let mut inner = self.inner.lock().await;
            if inner.pending_prompt != Some(PromptKind::SaveOrDiscard) {
                return None;
            }
            inner.pending_prompt = None;
            if choice == ResetChoice::Discard {
                inner.state.reset_to_idle();
                self.publish(&inner);
                log_info!("Session discarded");
                return Some(SessionEnd::Discarded);
            }
        }
        self.finish_session(SessionStatus::Abandoned).await
    }

    /// Applies the answer to the welcome-back prompt. Declining leaves the
    /// session paused.
    pub async fn answer_resume_prompt(&self, accept: bool) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if inner.pending_prompt != Some(PromptKind::ResumeAfterReturn) {
                return false;
            }
            inner.pending_prompt = None;
            if !accept {
                self.publish(&inner);
                return true;
            }
        }
        self.resume().await;
        true
    }

    /// Advances the countdown by one second and completes the session when it
    /// hits zero.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_from(None).await
    }

    /// A tick from a ticker whose token was cancelled while it waited for the
    /// lock is dropped; a newer ticker owns the countdown by then.
    async fn tick_from(&self, ticker: Option<&CancellationToken>) -> TickOutcome {
        let outcome = {
            let mut inner = self.inner.lock().await;
            if ticker.is_some_and(CancellationToken::is_cancelled) {
                return TickOutcome::Ignored;
            }
            let outcome = inner.state.tick();
            if outcome != TickOutcome::Ignored {
                self.publish(&inner);
            }
            outcome
        };

        if outcome == TickOutcome::Finished {
            self.finish_session(SessionStatus::Completed).await;
        }
        outcome
    }

    /// Reacts to one host lifecycle change using the state as it is now.
    pub async fn handle_lifecycle(
        &self,
        previous: AppLifecycle,
        next: AppLifecycle,
    ) -> LifecycleEffect {
        let mut inner = self.inner.lock().await;
        let effect = lifecycle::classify(previous, next, inner.state.status);
        match effect {
            LifecycleEffect::Distraction => {
                inner.state.register_distraction();
                self.cancel_ticker().await;
                log_info!(
                    "Distraction #{} detected, session paused",
                    inner.state.distraction_count
                );
                self.publish(&inner);
            }
            LifecycleEffect::ResumePrompt => {
                if inner.pending_prompt.is_none() {
                    inner.pending_prompt = Some(PromptKind::ResumeAfterReturn);
                    self.publish(&inner);
                    self.prompter.present(Prompt::resume_after_return());
                }
            }
            LifecycleEffect::Ignored => {}
        }
        effect
    }

    /// Starts consuming host lifecycle signals. Any previously attached
    /// receiver is detached first.
    pub async fn attach_lifecycle(
        &self,
        signals: mpsc::Receiver<AppLifecycle>,
        current: AppLifecycle,
    ) {
        let mut slot = self.monitor.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop();
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(lifecycle::monitor_loop(
            self.clone(),
            signals,
            current,
            cancel.clone(),
        ));
        *slot = Some(BackgroundTask { handle, cancel });
    }

    pub async fn detach_lifecycle(&self) {
        if let Some(task) = self.monitor.lock().await.take() {
            task.stop();
        }
    }

    /// Stops every background task owned by the controller.
    pub async fn shutdown(&self) {
        self.detach_lifecycle().await;
        self.cancel_ticker().await;
    }

    async fn finish_session(&self, status: SessionStatus) -> Option<SessionEnd> {
        let record = {
            let mut inner = self.inner.lock().await;
            let record = inner.state.finalize(status)?;
            inner.pending_prompt = None;
            self.publish(&inner);
            record
        };
        self.cancel_ticker().await;

        let saved = self.store.append_returning_id(&record).await;

        {
            let mut inner = self.inner.lock().await;
            inner.state.reset_to_idle();
            self.publish(&inner);
        }

        let minutes = record.actual_duration_secs / 60;
        match saved {
            Some(id) => {
                let body = match record.status {
                    SessionStatus::Completed => {
                        format!("Well done! You focused for {minutes} minutes.")
                    }
                    SessionStatus::Abandoned => format!(
                        "Session saved. You worked {minutes} minutes (success: {}%).",
                        record.success_rate
                    ),
                };
                self.notifier.notify("Session complete", &body);
                Some(SessionEnd::Saved { id, record })
            }
            None => {
                log_warn!("Session ended but was not saved");
                self.notifier
                    .notify("Error", "The session could not be saved.");
                Some(SessionEnd::NotSaved { record })
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.stop();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if controller.tick_from(Some(&token)).await != TickOutcome::Ticked {
                            break;
                        }
                    }
                }
            }
        });

        *ticker_guard = Some(BackgroundTask { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        if let Some(task) = self.ticker.lock().await.take() {
            task.stop();
        }
    }

    fn publish(&self, inner: &Inner) {
        self.snapshot_tx.send_replace(inner.snapshot());
    }
}
