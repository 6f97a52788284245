//! Read-side projection of the session history for the report screen.

mod types;

pub use types::{CategoryTotal, DailyTotal, ReportSummary};

use std::collections::HashMap;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};

use crate::db::{SessionRecord, SessionStatus, SessionStore};

/// Days shown in the daily chart, today included.
pub const TRAILING_DAYS: u64 = 7;

impl ReportSummary {
    /// Reads the full history and summarizes it against the local clock.
    pub async fn load(store: &SessionStore) -> Self {
        summarize(&store.list_all().await, Local::now())
    }
}

/// Builds every report figure from `records`, bucketing by calendar day in
/// `now`'s time zone. Records without a usable timestamp count as `now`.
pub fn summarize<Tz: TimeZone>(records: &[SessionRecord], now: DateTime<Tz>) -> ReportSummary {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut secs_by_day: HashMap<NaiveDate, u64> = HashMap::new();
    let mut secs_by_category: HashMap<&str, u64> = HashMap::new();
    let mut total_secs = 0u64;
    let mut total_distractions = 0u64;
    let mut completed_count = 0usize;
    let mut success_sum = 0u64;

    for record in records {
        let day = record
            .created_at
            .map(|at| at.with_timezone(&tz).date_naive())
            .unwrap_or(today);
        let secs = record.actual_duration_secs;

        *secs_by_day.entry(day).or_default() += secs;
        *secs_by_category.entry(record.category.as_str()).or_default() += secs;
        total_secs += secs;
        total_distractions += u64::from(record.distraction_count);
        success_sum += u64::from(record.success_rate);
        if record.status == SessionStatus::Completed {
            completed_count += 1;
        }
    }

    let daily = (0..TRAILING_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| DailyTotal {
            date,
            label: date.format("%a").to_string(),
            minutes: secs_to_minutes(secs_by_day.get(&date).copied().unwrap_or(0)),
        })
        .collect();

    let mut categories: Vec<CategoryTotal> = secs_by_category
        .into_iter()
        .map(|(category, secs)| CategoryTotal {
            category: category.to_string(),
            minutes: secs_to_minutes(secs),
        })
        .filter(|total| total.minutes > 0)
        .collect();
    categories.sort_by(|a, b| {
        b.minutes
            .cmp(&a.minutes)
            .then_with(|| a.category.cmp(&b.category))
    });

    let average_success_rate = if records.is_empty() {
        None
    } else {
        Some(success_sum as f64 / records.len() as f64)
    };

    ReportSummary {
        daily,
        categories,
        today_minutes: secs_to_minutes(secs_by_day.get(&today).copied().unwrap_or(0)),
        total_minutes: secs_to_minutes(total_secs),
        total_distractions,
        session_count: records.len(),
        completed_count,
        average_success_rate,
    }
}

/// Nearest whole minute, halves rounding up.
fn secs_to_minutes(secs: u64) -> u64 {
    (secs + 30) / 60
}
