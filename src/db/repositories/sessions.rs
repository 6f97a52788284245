use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_optional_datetime, parse_status, to_i64, to_u32_lenient, to_u64_lenient},
    models::{NewSessionRecord, SessionRecord, SessionStatus},
};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Rows written by older builds can carry a missing or unknown status. They
/// still count toward history, as sessions that did not complete.
fn read_status(id: i64, raw: Option<&str>) -> SessionStatus {
    match raw.map(parse_status) {
        Some(Ok(status)) => status,
        Some(Err(err)) => {
            log_warn!("Session {id}: {err:#}; treating it as abandoned");
            SessionStatus::Abandoned
        }
        None => {
            log_warn!("Session {id} has no status; treating it as abandoned");
            SessionStatus::Abandoned
        }
    }
}

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let id: i64 = row.get("id")?;
    let status: Option<String> = row.get("status")?;
    let date: Option<String> = row.get("date")?;

    Ok(SessionRecord {
        id,
        category: row.get::<_, Option<String>>("category")?.unwrap_or_default(),
        target_duration_secs: to_u64_lenient(row.get("target_duration")?),
        actual_duration_secs: to_u64_lenient(row.get("actual_duration")?),
        success_rate: to_u32_lenient(row.get("success_rate")?),
        status: read_status(id, status.as_deref()),
        distraction_count: to_u32_lenient(row.get("distraction_count")?),
        created_at: parse_optional_datetime(date),
    })
}

impl Database {
    /// Appends one finished session and returns the id SQLite assigned to it.
    pub async fn insert_session(
        &self,
        record: &NewSessionRecord,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions_detailed (category, target_duration, actual_duration, success_rate, status, distraction_count, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.category,
                    to_i64(record.target_duration_secs)?,
                    to_i64(record.actual_duration_secs)?,
                    record.success_rate,
                    record.status.as_str(),
                    record.distraction_count,
                    format_datetime(created_at),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Every stored session, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category, target_duration, actual_duration, success_rate, status, distraction_count, date
                 FROM sessions_detailed
                 ORDER BY id DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn open(dir: &tempfile::TempDir) -> Database {
        Database::new(dir.path().join("focus.sqlite3")).expect("failed to open db")
    }

    #[tokio::test]
    async fn inserted_session_reads_back_with_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 0, 0).unwrap();
        let record =
            NewSessionRecord::from_countdown("Reading", 1500, 900, SessionStatus::Abandoned, 3);

        let id = db.insert_session(&record, at).await.unwrap();
        let sessions = db.list_sessions().await.unwrap();

        assert_eq!(sessions.len(), 1);
        let stored = &sessions[0];
        assert_eq!(stored.id, id);
        assert_eq!(stored.category, "Reading");
        assert_eq!(stored.target_duration_secs, 1500);
        assert_eq!(stored.actual_duration_secs, 600);
        assert_eq!(stored.success_rate, 40);
        assert_eq!(stored.status, SessionStatus::Abandoned);
        assert_eq!(stored.distraction_count, 3);
        assert_eq!(stored.created_at, Some(at));
    }

    #[tokio::test]
    async fn ids_increase_and_listing_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        let now = Utc::now();

        let first = db
            .insert_session(
                &NewSessionRecord::from_countdown("A", 60, 0, SessionStatus::Completed, 0),
                now,
            )
            .await
            .unwrap();
        let second = db
            .insert_session(
                &NewSessionRecord::from_countdown("B", 60, 30, SessionStatus::Abandoned, 1),
                now,
            )
            .await
            .unwrap();

        assert!(second > first);
        let categories: Vec<_> = db
            .list_sessions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.category)
            .collect();
        assert_eq!(categories, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn legacy_rows_with_gaps_still_read() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        db.execute(|conn| {
            conn.execute_batch(
                "INSERT INTO sessions_detailed (category, target_duration, actual_duration, success_rate, status, distraction_count, date)
                 VALUES ('Proje', 600, 300, 50, 'YARIDA KALDI', NULL, 'not a date');",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let sessions = db.list_sessions().await.unwrap();

        assert_eq!(sessions[0].status, SessionStatus::Abandoned);
        assert_eq!(sessions[0].distraction_count, 0);
        assert_eq!(sessions[0].created_at, None);
    }

    #[tokio::test]
    async fn rows_with_missing_or_unknown_status_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir);
        for category in ["A", "B", "C"] {
            db.insert_session(
                &NewSessionRecord::from_countdown(category, 600, 0, SessionStatus::Completed, 0),
                Utc::now(),
            )
            .await
            .unwrap();
        }
        db.execute(|conn| {
            conn.execute_batch(
                "INSERT INTO sessions_detailed (category, target_duration, actual_duration, success_rate, status)
                 VALUES ('Null', 600, 120, 20, NULL);
                 INSERT INTO sessions_detailed (category, target_duration, actual_duration, success_rate, status)
                 VALUES ('Odd', 600, 60, 10, 'SOMETHING ELSE');",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let sessions = db.list_sessions().await.unwrap();

        assert_eq!(sessions.len(), 5);
        assert_eq!(sessions[0].category, "Odd");
        assert_eq!(sessions[0].status, SessionStatus::Abandoned);
        assert_eq!(sessions[1].category, "Null");
        assert_eq!(sessions[1].status, SessionStatus::Abandoned);
        assert_eq!(sessions[1].actual_duration_secs, 120);
        assert!(sessions[2..]
            .iter()
            .all(|s| s.status == SessionStatus::Completed));
    }
}
