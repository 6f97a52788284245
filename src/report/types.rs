use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: NaiveDate,
    /// Short weekday name, e.g. `Mon`.
    pub label: String,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Oldest first, ending with today.
    pub daily: Vec<DailyTotal>,
    pub categories: Vec<CategoryTotal>,
    pub today_minutes: u64,
    pub total_minutes: u64,
    pub total_distractions: u64,
    pub session_count: usize,
    pub completed_count: usize,
    pub average_success_rate: Option<f64>,
}
