//! In-memory store implementations

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{
    AddSummary, HistoryStore, OffersStore, PreferencesStore, SessionStore, ShoppingListItem, ShoppingListSink,
    StoreError,
};
use crate::domain::{
    HistoryEntryId, HouseholdId, HouseholdPreferences, MealHistoryEntry, Offer, OfferFilter, PlannedMeal, Session,
    SessionId, ShoppingListEntry, ShoppingListId,
};
use crate::parser::categorize_item;

/// Sessions held for the life of the process
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, session: Session) -> Result<(), StoreError> {
        debug!(session_id = %session.id, state = %session.state, "MemorySessionStore::put: called");
        self.sessions.write().await.insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }
}

/// Preferences per household, defaults when absent
#[derive(Default)]
pub struct MemoryPreferencesStore {
    preferences: RwLock<HashMap<HouseholdId, HouseholdPreferences>>,
}

impl MemoryPreferencesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn load(&self, household: &HouseholdId) -> Result<HouseholdPreferences, StoreError> {
        Ok(self
            .preferences
            .read()
            .await
            .get(household)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, household: &HouseholdId, preferences: &HouseholdPreferences) -> Result<(), StoreError> {
        self.preferences
            .write()
            .await
            .insert(household.clone(), preferences.clone());
        Ok(())
    }
}

/// Meal history kept in insertion order
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<Vec<MealHistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry for a household, oldest first
    pub async fn all(&self, household: &HouseholdId) -> Vec<MealHistoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| &e.household_id == household)
            .cloned()
            .collect()
    }

    /// Insert a fully built entry, keeping its timestamp
    pub async fn insert(&self, entry: MealHistoryEntry) {
        self.entries.write().await.push(entry);
    }
}

/// Shared window logic for history stores
pub(super) fn recent_window(entries: &[MealHistoryEntry], household: &HouseholdId, weeks_back: u32) -> Vec<MealHistoryEntry> {
    // A window reaching past the representable calendar has no cutoff
    let cutoff = TimeDelta::try_weeks(i64::from(weeks_back)).and_then(|span| Utc::now().checked_sub_signed(span));
    let mut recent: Vec<MealHistoryEntry> = entries
        .iter()
        .filter(|e| &e.household_id == household && cutoff.is_none_or(|c| e.planned_at >= c))
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.planned_at.cmp(&a.planned_at));
    recent
}

pub(super) fn validate_rating(rating: u8) -> Result<(), StoreError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!("rating must be between 1 and 5, got {}", rating)))
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn recent(&self, household: &HouseholdId, weeks_back: u32) -> Result<Vec<MealHistoryEntry>, StoreError> {
        Ok(recent_window(&self.entries.read().await, household, weeks_back))
    }

    async fn append(
        &self,
        session: &SessionId,
        household: &HouseholdId,
        plan_text: &str,
        meals: Vec<PlannedMeal>,
        entries: Vec<ShoppingListEntry>,
    ) -> Result<MealHistoryEntry, StoreError> {
        debug!(%session, %household, "MemoryHistoryStore::append: called");
        let entry = MealHistoryEntry::new(household.clone(), plan_text, meals, entries).with_session(session.clone());
        let mut stored = self.entries.write().await;
        if let Some(existing) = stored.iter_mut().find(|e| e.session_id.as_ref() == Some(session)) {
            debug!(id = %existing.id, %session, "MemoryHistoryStore::append: replacing entry for session");
            existing.replace_plan(entry);
            return Ok(existing.clone());
        }
        stored.push(entry.clone());
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
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.rating = Some(rating);
        entry.comment = comment;
        entry.would_repeat = would_repeat;
        Ok(entry.clone())
    }
}

/// Fixed set of offers, optionally loaded from a JSON array
#[derive(Default)]
pub struct MemoryOffersStore {
    offers: Vec<Offer>,
}

impl MemoryOffersStore {
    pub fn new(offers: Vec<Offer>) -> Self {
        Self { offers }
    }

    /// Load offers from a JSON file holding an array of offers
    pub async fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        let offers: Vec<Offer> = serde_json::from_str(&content)?;
        info!(count = offers.len(), path = %path.display(), "Loaded offers");
        Ok(Self::new(offers))
    }
}

#[async_trait]
impl OffersStore for MemoryOffersStore {
    async fn available(&self, filter: &OfferFilter) -> Result<Vec<Offer>, StoreError> {
        let mut offers: Vec<Offer> = self.offers.iter().filter(|o| filter.matches(o)).cloned().collect();
        offers.sort_by(|a, b| {
            a.department
                .cmp(&b.department)
                .then_with(|| match (a.price_numeric, b.price_numeric) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(offers)
    }
}

/// Shopping lists keyed by id, one active list per household
#[derive(Default)]
pub struct MemoryShoppingList {
    active: RwLock<HashMap<HouseholdId, ShoppingListId>>,
    lists: RwLock<HashMap<ShoppingListId, Vec<ShoppingListItem>>>,
}

impl MemoryShoppingList {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShoppingListSink for MemoryShoppingList {
    async fn active_list(&self, household: &HouseholdId) -> Result<ShoppingListId, StoreError> {
        let mut active = self.active.write().await;
        let id = active
            .entry(household.clone())
            .or_insert_with(|| ShoppingListId::new(format!("{}-active", household)))
            .clone();
        self.lists.write().await.entry(id.clone()).or_default();
        Ok(id)
    }

    async fn add_entries(&self, list: &ShoppingListId, entries: &[ShoppingListEntry]) -> Result<AddSummary, StoreError> {
        debug!(%list, count = entries.len(), "MemoryShoppingList::add_entries: called");
        let mut lists = self.lists.write().await;
        let items = lists
            .get_mut(list)
            .ok_or_else(|| StoreError::NotFound(list.to_string()))?;

        let mut summary = AddSummary::default();
        for entry in entries {
            let mut entry = entry.clone();
            if entry.category.is_none() {
                entry.category = Some(categorize_item(&entry.name).to_string());
            }

            let name = entry.name.to_lowercase();
            match items
                .iter()
                .position(|i| !i.checked && i.entry.name.to_lowercase() == name)
            {
                Some(idx) => {
                    merge_into(&mut items[idx].entry, &entry);
                    summary.merged += 1;
                }
                None => {
                    items.push(ShoppingListItem { entry, checked: false });
                    summary.inserted += 1;
                }
            }
        }

        debug!(inserted = summary.inserted, merged = summary.merged, "add_entries: done");
        Ok(summary)
    }

    async fn items(&self, list: &ShoppingListId) -> Result<Vec<ShoppingListItem>, StoreError> {
        self.lists
            .read()
            .await
            .get(list)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(list.to_string()))
    }

    async fn check(&self, list: &ShoppingListId, name: &str) -> Result<bool, StoreError> {
        let mut lists = self.lists.write().await;
        let items = lists
            .get_mut(list)
            .ok_or_else(|| StoreError::NotFound(list.to_string()))?;
        let name = name.to_lowercase();
        match items.iter_mut().find(|i| !i.checked && i.entry.name.to_lowercase() == name) {
            Some(item) => {
                item.checked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Merge a duplicate entry into an existing one
///
/// Numeric quantities with the same unit are added (`1 kg` + `2 kg` = `3 kg`); anything else is
/// joined as text (`1 kg + 2 bunch`).
fn merge_into(existing: &mut ShoppingListEntry, new: &ShoppingListEntry) {
    let same_unit = match (&existing.unit, &new.unit) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    };
    let numbers = (
        existing.quantity.as_deref().and_then(parse_quantity),
        new.quantity.as_deref().and_then(parse_quantity),
    );

    match numbers {
        (Some(a), Some(b)) if same_unit => {
            existing.quantity = Some(format_quantity(a + b));
        }
        _ if existing.amount().is_none() && new.amount().is_none() => {}
        _ => {
            let a = existing.amount().unwrap_or_else(|| "1".to_string());
            let b = new.amount().unwrap_or_else(|| "1".to_string());
            existing.quantity = Some(format!("{} + {}", a, b));
            existing.unit = None;
        }
    }

    existing.price_estimate = match (existing.price_estimate, new.price_estimate) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    };
    if existing.category.is_none() {
        existing.category = new.category.clone();
    }
}

fn parse_quantity(q: &str) -> Option<f64> {
    q.trim().replace(',', ".").parse().ok()
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.3}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
