//! Degraded-mode facade over [`Database`].
//!
//! Callers never see an error from here: a store that cannot be opened or
//! written turns into `false`, `None` or an empty list, and the cause is
//! logged. The database is opened lazily on first use and shared by every
//! clone afterwards.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::OnceCell;

use super::{
    connection::Database,
    models::{NewSessionRecord, SessionRecord},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Clone)]
pub struct SessionStore {
    path: Arc<PathBuf>,
    db: Arc<OnceCell<Database>>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            db: Arc::new(OnceCell::new()),
        }
    }

    /// Wraps an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            path: Arc::new(db.path().to_path_buf()),
            db: Arc::new(OnceCell::new_with(Some(db))),
        }
    }

    async fn database(&self) -> Result<&Database> {
        let path = Arc::clone(&self.path);
        self.db
            .get_or_try_init(|| async move {
                let path = path.as_ref().clone();
                tokio::task::spawn_blocking(move || Database::new(path))
                    .await
                    .context("database open task panicked")?
            })
            .await
    }

    /// Opens the database and runs migrations. Safe to call repeatedly; a
    /// failed attempt is retried by the next call that needs the database.
    pub async fn initialize(&self) -> bool {
        match self.database().await {
            Ok(_) => true,
            Err(err) => {
                log_error!(
                    "Session store unavailable at {}: {err:#}",
                    self.path.display()
                );
                false
            }
        }
    }

    pub async fn append(&self, record: &NewSessionRecord) -> bool {
        self.append_returning_id(record).await.is_some()
    }

    pub async fn append_returning_id(&self, record: &NewSessionRecord) -> Option<i64> {
        let result = async {
            let db = self.database().await?;
            db.insert_session(record, Utc::now()).await
        }
        .await;

        match result {
            Ok(id) => {
                log_info!(
                    "Saved {} session {id} ({}s of {}s in {})",
                    record.status.as_str(),
                    record.actual_duration_secs,
                    record.target_duration_secs,
                    record.category
                );
                Some(id)
            }
            Err(err) => {
                log_error!("Failed to save session: {err:#}");
                None
            }
        }
    }

    /// All sessions, newest first. Empty when the store cannot be read.
    pub async fn list_all(&self) -> Vec<SessionRecord> {
        let result = async {
            let db = self.database().await?;
            db.list_sessions().await
        }
        .await;

        result.unwrap_or_else(|err| {
            log_error!("Failed to load sessions: {err:#}");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SessionStatus;

    fn record(category: &str) -> NewSessionRecord {
        NewSessionRecord::from_countdown(category, 1500, 0, SessionStatus::Completed, 1)
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("focus.sqlite3"));

        assert!(store.initialize().await);
        assert!(store.initialize().await);
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn append_then_list_returns_new_record_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("focus.sqlite3"));
        store.initialize().await;

        assert!(store.append(&record("Coding")).await);
        let id = store.append_returning_id(&record("Homework")).await.unwrap();

        let all = store.list_all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].category, "Homework");
        assert!(all[0].created_at.is_some());
    }

    #[tokio::test]
    async fn opens_lazily_without_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("focus.sqlite3"));

        assert!(store.append(&record("Coding")).await);
        assert_eq!(store.clone().list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn unusable_path_degrades_to_noops() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = SessionStore::new(blocker.join("focus.sqlite3"));

        assert!(!store.initialize().await);
        assert!(!store.append(&record("Coding")).await);
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn wraps_an_open_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("focus.sqlite3")).unwrap();
        let store = SessionStore::from_database(db);

        assert!(store.append(&record("Writing")).await);
        assert_eq!(store.list_all().await[0].category, "Writing");
    }

    #[tokio::test]
    async fn one_row_without_status_does_not_hide_history() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("focus.sqlite3")).unwrap();
        let store = SessionStore::from_database(db.clone());
        for _ in 0..3 {
            assert!(store.append(&record("Coding")).await);
        }
        db.execute(|conn| {
            conn.execute_batch(
                "INSERT INTO sessions_detailed (category, target_duration, actual_duration, success_rate, status)
                 VALUES ('Coding', 1500, 300, 20, NULL);",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let all = store.list_all().await;

        assert_eq!(all.len(), 4);
        assert_eq!(all[0].status, SessionStatus::Abandoned);
    }
}
