//! Collaborator interfaces
//!
//! The planner only touches preferences, history, offers, shopping lists and sessions through
//! these traits. In-memory implementations back tests and the CLI; preferences and history also
//! have file-backed implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    HistoryEntryId, HouseholdId, HouseholdPreferences, MealHistoryEntry, Offer, OfferFilter, PlannedMeal, Session,
    SessionId, ShoppingListEntry, ShoppingListId,
};

mod file;
mod memory;

pub use file::{JsonlHistoryStore, YamlPreferencesStore};
pub use memory::{
    MemoryHistoryStore, MemoryOffersStore, MemoryPreferencesStore, MemorySessionStore, MemoryShoppingList,
};

/// Errors from collaborator stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for StoreError {
    fn from(e: serde_yaml::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Per-session conversation state keyed by id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Replace the whole record
    async fn put(&self, session: Session) -> Result<(), StoreError>;

    /// Returns whether a session was removed
    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError>;
}

/// One preferences document per household
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Stored preferences, or defaults when the household has none
    async fn load(&self, household: &HouseholdId) -> Result<HouseholdPreferences, StoreError>;

    async fn save(&self, household: &HouseholdId, preferences: &HouseholdPreferences) -> Result<(), StoreError>;
}

/// Append-only meal history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Entries planned within the last `weeks_back` weeks, newest first
    async fn recent(&self, household: &HouseholdId, weeks_back: u32) -> Result<Vec<MealHistoryEntry>, StoreError>;

    /// Record the plan a session accepted
    ///
    /// Keyed by session: a repeated call for the same session replaces the earlier entry's
    /// plan content and returns it with its original id, so a retried accept never duplicates.
    async fn append(
        &self,
        session: &SessionId,
        household: &HouseholdId,
        plan_text: &str,
        meals: Vec<PlannedMeal>,
        entries: Vec<ShoppingListEntry>,
    ) -> Result<MealHistoryEntry, StoreError>;

    /// Attach a 1-5 rating to an existing entry
    async fn rate(
        &self,
        id: &HistoryEntryId,
        rating: u8,
        comment: Option<String>,
        would_repeat: bool,
    ) -> Result<MealHistoryEntry, StoreError>;
}

/// Read-only discount offers
#[async_trait]
pub trait OffersStore: Send + Sync {
    /// Offers passing the filter, ordered by department then price
    async fn available(&self, filter: &OfferFilter) -> Result<Vec<Offer>, StoreError>;
}

/// Destination for accepted shopping-list entries
#[async_trait]
pub trait ShoppingListSink: Send + Sync {
    /// The household's active list, created on first use
    async fn active_list(&self, household: &HouseholdId) -> Result<ShoppingListId, StoreError>;

    /// Add entries, merging duplicates among unchecked items
    async fn add_entries(&self, list: &ShoppingListId, entries: &[ShoppingListEntry]) -> Result<AddSummary, StoreError>;

    async fn items(&self, list: &ShoppingListId) -> Result<Vec<ShoppingListItem>, StoreError>;

    /// Mark the first item with this name (case-insensitive) checked; returns whether one was found
    async fn check(&self, list: &ShoppingListId, name: &str) -> Result<bool, StoreError>;
}

/// Outcome of `ShoppingListSink::add_entries`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSummary {
    pub inserted: usize,
    pub merged: usize,
}

/// An entry on a shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub entry: ShoppingListEntry,
    pub checked: bool,
}
