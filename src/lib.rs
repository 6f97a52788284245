mod console;
pub mod db;
pub mod lifecycle;
pub mod report;
pub mod settings;
pub mod timer;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use db::SessionStore;
use log::{error, warn};
use report::ReportSummary;
use settings::SettingsStore;
use timer::{Notifier, Prompter, TimerConfig, TimerController};

pub use console::ConsoleHost;

const DATA_DIR_ENV: &str = "FOCUS_TIMER_DATA_DIR";

/// Everything the screens share: the history store, the single timer and
/// the user settings.
pub struct AppState {
    pub store: SessionStore,
    pub timer: TimerController,
    pub settings: SettingsStore,
}

impl AppState {
    pub async fn open(
        data_dir: &Path,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let store = SessionStore::new(data_dir.join("focus.sqlite3"));
        if !store.initialize().await {
            warn!("Running without session history; nothing will be saved");
        }

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let preferences = settings.snapshot();
        let timer = TimerController::new(
            store.clone(),
            prompter,
            notifier,
            TimerConfig::from_env(preferences.target_minutes, preferences.selected_category),
        );

        Ok(Self {
            store,
            timer,
            settings,
        })
    }

    /// Selects a known category; rejected during a session.
    pub async fn select_category(&self, name: &str) -> bool {
        if !self.settings.has_category(name) || !self.timer.select_category(name).await {
            return false;
        }
        if let Err(err) = self.settings.set_selected_category(name) {
            error!("Failed to remember selected category: {err:#}");
        }
        true
    }

    /// Removes a category from the set. The category of an active session
    /// stays; when the selection goes, the timer follows the new selection.
    pub async fn remove_category(&self, name: &str) -> Result<()> {
        let snapshot = self.timer.get_snapshot().await;
        if snapshot.is_session_active && snapshot.state.selected_category == name {
            bail!("cannot remove '{name}' while its session is running");
        }
        self.settings.remove_category(name)?;
        let selected = self.settings.snapshot().selected_category;
        if selected != snapshot.state.selected_category {
            self.timer.select_category(&selected).await;
        }
        Ok(())
    }

    pub async fn adjust_target(&self, delta_minutes: i32) -> bool {
        if !self.timer.adjust_target(delta_minutes).await {
            return false;
        }
        let minutes = self.timer.get_snapshot().await.state.target_minutes;
        if let Err(err) = self.settings.set_target_minutes(minutes) {
            error!("Failed to remember target minutes: {err:#}");
        }
        true
    }

    pub async fn report(&self) -> ReportSummary {
        ReportSummary::load(&self.store).await
    }
}

/// `FOCUS_TIMER_DATA_DIR`, or `focus-timer` under the platform data dir.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("focus-timer"))
        .ok_or_else(|| anyhow!("no data directory available; set {DATA_DIR_ENV}"))
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Focus timer starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let host = Arc::new(ConsoleHost);
        let app = AppState::open(&data_dir()?, host.clone(), host).await?;
        console::run(app).await
    })
}
