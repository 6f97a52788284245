use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::timer::state::DEFAULT_TARGET_MINUTES;

pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "Coding",
    "Studying",
    "Project",
    "Homework",
    "Reading",
    "Writing",
    "Other",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub categories: Vec<String>,
    pub selected_category: String,
    pub target_minutes: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            selected_category: DEFAULT_CATEGORIES[0].to_string(),
            target_minutes: DEFAULT_TARGET_MINUTES,
        }
    }
}

impl UserSettings {
    /// Repairs hand-edited files: at least one category, a selection that
    /// exists, a target of at least one minute.
    fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.categories.len());
        for name in self.categories.drain(..) {
            if !name.is_empty() && !seen.contains(&name) {
                seen.push(name);
            }
        }
        self.categories = seen;
        if self.categories.is_empty() {
            self.categories = UserSettings::default().categories;
        }
        if !self.categories.contains(&self.selected_category) {
            self.selected_category = self.categories[0].clone();
        }
        self.target_minutes = self.target_minutes.max(1);
        self
    }
}

/// JSON-backed user settings, including the ordered category set.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str::<UserSettings>(&contents)
                .unwrap_or_default()
                .normalized()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn categories(&self) -> Vec<String> {
        self.read().categories.clone()
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.read().categories.iter().any(|c| c == name)
    }

    pub fn add_category(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            bail!("category name must not be empty");
        }
        let mut guard = self.write();
        if guard.categories.iter().any(|c| c == name) {
            bail!("category '{name}' already exists");
        }
        guard.categories.push(name.to_string());
        self.persist(&guard)
    }

    /// Removes a category. The last remaining one cannot be removed; removing
    /// the selected one selects the first that is left.
    pub fn remove_category(&self, name: &str) -> Result<()> {
        let mut guard = self.write();
        let Some(index) = guard.categories.iter().position(|c| c == name) else {
            bail!("category '{name}' does not exist");
        };
        if guard.categories.len() == 1 {
            bail!("at least one category is required");
        }
        guard.categories.remove(index);
        if guard.selected_category == name {
            guard.selected_category = guard.categories[0].clone();
        }
        self.persist(&guard)
    }

    pub fn set_selected_category(&self, name: &str) -> Result<()> {
        let mut guard = self.write();
        if !guard.categories.iter().any(|c| c == name) {
            bail!("category '{name}' does not exist");
        }
        guard.selected_category = name.to_string();
        self.persist(&guard)
    }

    pub fn set_target_minutes(&self, minutes: u32) -> Result<()> {
        if minutes < 1 {
            bail!("target must be at least one minute");
        }
        let mut guard = self.write();
        guard.target_minutes = minutes;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
