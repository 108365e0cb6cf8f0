//! File-backed stores for preferences and meal history

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory::{recent_window, validate_rating};
use super::{HistoryStore, PreferencesStore, StoreError};
use crate::domain::{
    HistoryEntryId, HouseholdId, HouseholdPreferences, MealHistoryEntry, PlannedMeal, SessionId, ShoppingListEntry,
};

/// One `<household>.yaml` document per household in a directory
pub struct YamlPreferencesStore {
    dir: PathBuf,
}

impl YamlPreferencesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding a household's preferences
    pub fn path_for(&self, household: &HouseholdId) -> PathBuf {
        let name: String = household
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.yaml", name))
    }
}

#[async_trait]
impl PreferencesStore for YamlPreferencesStore {
    async fn load(&self, household: &HouseholdId) -> Result<HouseholdPreferences, StoreError> {
        let path = self.path_for(household);
        if !path.exists() {
            debug!(path = %path.display(), "YamlPreferencesStore::load: no file, using defaults");
            return Ok(HouseholdPreferences::default());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(serde_yaml::from_str(&content)?)
    }

    async fn save(&self, household: &HouseholdId, preferences: &HouseholdPreferences) -> Result<(), StoreError> {
        let path = self.path_for(household);
        tokio::fs::create_dir_all(&self.dir).await?;
        let content = serde_yaml::to_string(preferences)?;
        tokio::fs::write(&path, content).await?;
        info!(path = %path.display(), "Saved preferences");
        Ok(())
    }
}

/// One line of the history file
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HistoryRecord {
    Entry(MealHistoryEntry),
    Rating {
        id: HistoryEntryId,
        rating: u8,
        comment: Option<String>,
        would_repeat: bool,
        rated_at: DateTime<Utc>,
    },
}

/// Append-only JSONL meal history
///
/// Entries and later ratings are separate lines; ratings are folded onto their entry on read.
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and fold every record, oldest first
    pub async fn load_all(&self) -> Result<Vec<MealHistoryEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;

        let mut entries: Vec<MealHistoryEntry> = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(line) {
                Ok(HistoryRecord::Entry(entry)) => match entries.iter_mut().find(|e| e.id == entry.id) {
                    Some(existing) => *existing = entry,
                    None => entries.push(entry),
                },
                Ok(HistoryRecord::Rating {
                    id,
                    rating,
                    comment,
                    would_repeat,
                    ..
                }) => {
                    if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
                        entry.rating = Some(rating);
                        entry.comment = comment;
                        entry.would_repeat = would_repeat;
                    }
                }
                Err(e) => {
                    // A torn final write must not make the whole history unreadable
                    warn!(line = lineno + 1, error = %e, path = %self.path.display(), "Skipping unreadable history line");
                }
            }
        }
        Ok(entries)
    }

    async fn append_record(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn recent(&self, household: &HouseholdId, weeks_back: u32) -> Result<Vec<MealHistoryEntry>, StoreError> {
        let entries = self.load_all().await?;
        Ok(recent_window(&entries, household, weeks_back))
    }

    async fn append(
        &self,
        session: &SessionId,
        household: &HouseholdId,
        plan_text: &str,
        meals: Vec<PlannedMeal>,
        entries: Vec<ShoppingListEntry>,
    ) -> Result<MealHistoryEntry, StoreError> {
        debug!(%session, %household, "JsonlHistoryStore::append: called");
        let fresh = MealHistoryEntry::new(household.clone(), plan_text, meals, entries).with_session(session.clone());
        let entry = match self
            .load_all()
            .await?
            .into_iter()
            .find(|e| e.session_id.as_ref() == Some(session))
        {
            Some(mut existing) => {
                debug!(id = %existing.id, %session, "JsonlHistoryStore::append: replacing entry for session");
                existing.replace_plan(fresh);
                existing
            }
            None => fresh,
        };
        self.append_record(&HistoryRecord::Entry(entry.clone())).await?;
        Ok(entry)
    }

    async fn rate(
        &self,
        id: &HistoryEntryId,
        rating: u8,
        comment: Option<String>,
        would_repeat: bool,
    ) -> Result<MealHistoryEntry, StoreError> {
        validate_rating(rating)?;
        let mut entry = self
            .load_all()
            .await?
            .into_iter()
            .find(|e| &e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        self.append_record(&HistoryRecord::Rating {
            id: id.clone(),
            rating,
            comment: comment.clone(),
            would_repeat,
            rated_at: Utc::now(),
        })
        .await?;

        entry.rating = Some(rating);
        entry.comment = comment;
        entry.would_repeat = would_repeat;
        Ok(entry)
    }
}
