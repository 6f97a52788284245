//! SQLite access through one dedicated thread.
//!
//! `rusqlite::Connection` is not `Sync`, so the connection lives on a worker
//! thread and async callers ship closures to it. The worker stops once every
//! [`Database`] clone is gone and the job queue drains.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Owns the queue into the worker thread. Dropping it closes the queue and
/// waits for the thread to finish the jobs already queued.
struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn submit(&self, job: Job) -> Result<()> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("database worker already stopped"))?;
        jobs.send(job)
            .map_err(|_| anyhow!("database worker is no longer accepting jobs"))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log_error!("Database worker panicked");
            }
        }
    }
}

/// Opens the file, switches to WAL and migrates the schema.
fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        log_warn!("WAL mode unavailable, using default journal: {err}");
    }
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn serve(mut conn: Connection, jobs: mpsc::Receiver<Job>) {
    for job in jobs {
        job(&mut conn);
    }
    log_info!("Database worker stopped");
}

/// Handle to the session database. Clones share one worker thread.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Opens (or creates) the database file and brings the schema up to
    /// date. Blocks until the worker reports whether that succeeded.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<()>>(1);
        let worker_path = path.clone();

        let thread = thread::Builder::new()
            .name("focus-timer-db".into())
            .spawn(move || match open_connection(&worker_path) {
                Ok(conn) => {
                    if opened_tx.send(Ok(())).is_ok() {
                        serve(conn, jobs_rx);
                    }
                }
                Err(err) => {
                    let _ = opened_tx.send(Err(err));
                }
            })
            .context("failed to spawn database worker thread")?;

        let worker = Worker {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        };
        opened_rx
            .recv()
            .map_err(|_| anyhow!("database worker exited during startup"))??;

        log_info!("Session database ready at {}", path.display());
        Ok(Self {
            worker: Arc::new(worker),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `task` on the worker's connection and hands back its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.worker.submit(Box::new(move |conn| {
            // The caller may have given up waiting; the work is done either way.
            let _ = reply_tx.send(task(conn));
        }))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database worker dropped the job"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_directories_and_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("nested").join("focus.sqlite3");

        let db = Database::new(db_path.clone()).expect("failed to open db");

        assert!(db_path.exists());
        assert_eq!(db.path(), db_path.as_path());
    }

    #[tokio::test]
    async fn execute_runs_on_worker_connection() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db = Database::new(dir.path().join("focus.sqlite3")).expect("failed to open db");

        let answer: i64 = db
            .execute(|conn| Ok(conn.query_row("SELECT 40 + 2", [], |row| row.get(0))?))
            .await
            .expect("query failed");

        assert_eq!(answer, 42);
    }

    #[tokio::test]
    async fn clones_share_the_same_worker() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db = Database::new(dir.path().join("focus.sqlite3")).expect("failed to open db");
        let other = db.clone();
        drop(db);

        let tables: i64 = other
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'sessions_detailed'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .expect("query failed");

        assert_eq!(tables, 1);
    }

    #[test]
    fn startup_failure_is_reported_not_hung() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("focus.sqlite3");
        Connection::open(&db_path)
            .and_then(|conn| conn.pragma_update(None, "user_version", 99))
            .expect("failed to seed future schema");

        let err = Database::new(db_path).err().expect("newer schema must be refused");

        assert!(format!("{err:#}").contains("migrations"));
    }
}
