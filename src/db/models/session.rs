//! Session-related data models.
//!
//! - `NewSessionRecord`: what the timer hands to the store when a session ends
//! - `SessionRecord`: a persisted row, immutable once written

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }
}

/// Outcome of a finished session, ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionRecord {
    pub category: String,
    pub target_duration_secs: u64,
    pub actual_duration_secs: u64,
    pub success_rate: u32,
    pub status: SessionStatus,
    pub distraction_count: u32,
}

impl NewSessionRecord {
    /// Builds the record for a session that started at `initial_secs` and
    /// ended with `remaining_secs` left on the countdown.
    ///
    /// Elapsed time is clamped to the initial duration, so the success rate
    /// never exceeds 100.
    pub fn from_countdown(
        category: impl Into<String>,
        initial_secs: u64,
        remaining_secs: u64,
        status: SessionStatus,
        distraction_count: u32,
    ) -> Self {
        let actual = initial_secs.saturating_sub(remaining_secs);
        Self {
            category: category.into(),
            target_duration_secs: initial_secs,
            actual_duration_secs: actual,
            success_rate: success_rate(actual, initial_secs),
            status,
            distraction_count,
        }
    }
}

/// `round(actual / target * 100)`; zero when the target is zero.
pub fn success_rate(actual_secs: u64, target_secs: u64) -> u32 {
    if target_secs == 0 {
        return 0;
    }
    let actual = actual_secs.min(target_secs) as f64;
    (actual / target_secs as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: i64,
    pub category: String,
    pub target_duration_secs: u64,
    pub actual_duration_secs: u64,
    pub success_rate: u32,
    pub status: SessionStatus,
    pub distraction_count: u32,
    /// `None` when the stored timestamp is missing or unreadable.
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_session_reaches_full_rate() {
        let record =
            NewSessionRecord::from_countdown("Coding", 1500, 0, SessionStatus::Completed, 2);
        assert_eq!(record.target_duration_secs, 1500);
        assert_eq!(record.actual_duration_secs, 1500);
        assert_eq!(record.success_rate, 100);
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.distraction_count, 2);
    }

    #[test]
    fn abandoned_session_uses_elapsed_time() {
        let record =
            NewSessionRecord::from_countdown("Reading", 1500, 900, SessionStatus::Abandoned, 0);
        assert_eq!(record.actual_duration_secs, 600);
        assert_eq!(record.success_rate, 40);
        assert_eq!(record.status, SessionStatus::Abandoned);
    }

    #[test]
    fn success_rate_rounds_to_nearest_percent() {
        assert_eq!(success_rate(1, 3), 33);
        assert_eq!(success_rate(2, 3), 67);
        assert_eq!(success_rate(0, 60), 0);
    }

    #[test]
    fn success_rate_is_capped_and_guarded() {
        assert_eq!(success_rate(120, 60), 100);
        assert_eq!(success_rate(10, 0), 0);
    }
}
