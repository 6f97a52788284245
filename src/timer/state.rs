use serde::{Deserialize, Serialize};

use crate::db::{NewSessionRecord, SessionStatus};

pub const MIN_TARGET_MINUTES: u32 = 1;
pub const DEFAULT_TARGET_MINUTES: u32 = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    /// The session has ended and its record is being written.
    Finalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed.
    Ignored,
    Ticked,
    /// The countdown hit zero and the machine moved to `Finalizing`.
    Finished,
}

/// In-memory state of the focus timer. All transitions are plain methods
/// that either apply and return `true`, or reject and leave `self` untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub target_minutes: u32,
    pub remaining_secs: u64,
    /// Countdown value captured when the active session began.
    pub initial_secs: u64,
    pub distraction_count: u32,
    pub selected_category: String,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_MINUTES, String::new())
    }
}

impl TimerState {
    pub fn new(target_minutes: u32, category: impl Into<String>) -> Self {
        let target_minutes = target_minutes.max(MIN_TARGET_MINUTES);
        let secs = minutes_to_secs(target_minutes);
        Self {
            status: TimerStatus::Idle,
            target_minutes,
            remaining_secs: secs,
            initial_secs: secs,
            distraction_count: 0,
            selected_category: category.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_session_active(&self) -> bool {
        self.status != TimerStatus::Idle
    }

    pub fn start(&mut self) -> bool {
        if self.status != TimerStatus::Idle {
            return false;
        }
        self.initial_secs = self.remaining_secs;
        self.distraction_count = 0;
        self.status = TimerStatus::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    /// The app left the foreground while the countdown was running.
    pub fn register_distraction(&mut self) -> bool {
        if !self.pause() {
            return false;
        }
        self.distraction_count += 1;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = TimerStatus::Finalizing;
            return TickOutcome::Finished;
        }
        TickOutcome::Ticked
    }

    /// Freezes the session and computes its record. Returns `None` when no
    /// session is active.
    pub fn finalize(&mut self, status: SessionStatus) -> Option<NewSessionRecord> {
        if !self.is_session_active() {
            return None;
        }
        self.status = TimerStatus::Finalizing;
        Some(NewSessionRecord::from_countdown(
            self.selected_category.clone(),
            self.initial_secs,
            self.remaining_secs,
            status,
            self.distraction_count,
        ))
    }

    /// Ends any session and restores the countdown to the configured target.
    pub fn reset_to_idle(&mut self) {
        let secs = minutes_to_secs(self.target_minutes);
        self.status = TimerStatus::Idle;
        self.remaining_secs = secs;
        self.initial_secs = secs;
        self.distraction_count = 0;
    }

    /// Shifts the target by `delta_minutes`. Rejected while a session is
    /// active or when the result would fall below one minute.
    pub fn adjust_target(&mut self, delta_minutes: i32) -> bool {
        if self.is_session_active() {
            return false;
        }
        let next = i64::from(self.target_minutes) + i64::from(delta_minutes);
        if next < i64::from(MIN_TARGET_MINUTES) || next > i64::from(u32::MAX) {
            return false;
        }
        self.target_minutes = next as u32;
        self.reset_to_idle();
        true
    }

    pub fn select_category(&mut self, category: &str) -> bool {
        if self.is_session_active() {
            return false;
        }
        self.selected_category = category.to_string();
        true
    }
}

pub fn minutes_to_secs(minutes: u32) -> u64 {
    u64::from(minutes) * 60
}

/// `MM:SS`, with minutes growing past two digits for long targets.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
