//! Shopping list entries and history records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{HistoryEntryId, HouseholdId, SessionId};

/// A normalized shopping-list line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListEntry {
    pub name: String,

    /// Numeric amount as written, e.g. "1", "1.5", "500"
    pub quantity: Option<String>,

    pub unit: Option<String>,

    /// Section the item was listed under; `None` leaves it for a downstream categorizer
    pub category: Option<String>,

    pub price_estimate: Option<f64>,
}

impl ShoppingListEntry {
    /// Entry with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
            category: None,
            price_estimate: None,
        }
    }

    /// Quantity and unit as one display string, e.g. "1 kg"
    pub fn amount(&self) -> Option<String> {
        match (&self.quantity, &self.unit) {
            (Some(q), Some(u)) => Some(format!("{} {}", q, u)),
            (Some(q), None) => Some(q.clone()),
            (None, Some(u)) => Some(u.clone()),
            (None, None) => None,
        }
    }
}

impl std::fmt::Display for ShoppingListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(amount) = self.amount() {
            write!(f, "{} {}", amount, self.name)?;
        } else {
            write!(f, "{}", self.name)?;
        }
        if let Some(price) = self.price_estimate {
            write!(f, " ({:.2})", price)?;
        }
        Ok(())
    }
}

/// A meal extracted from a plan, e.g. "Day 3: Fish tacos"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub day: u32,
    pub name: String,
}

/// A past accepted plan and its rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealHistoryEntry {
    pub id: HistoryEntryId,

    pub household_id: HouseholdId,

    /// Planning session that accepted this plan; one entry per session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    pub planned_at: DateTime<Utc>,

    pub plan_text: String,

    #[serde(default)]
    pub meals: Vec<PlannedMeal>,

    #[serde(default)]
    pub entries: Vec<ShoppingListEntry>,

    /// 1-5 stars once the household has cooked it
    #[serde(default)]
    pub rating: Option<u8>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default = "default_would_repeat")]
    pub would_repeat: bool,
}

fn default_would_repeat() -> bool {
    true
}

impl MealHistoryEntry {
    /// Create an unrated history entry planned now
    pub fn new(
        household_id: HouseholdId,
        plan_text: impl Into<String>,
        meals: Vec<PlannedMeal>,
        entries: Vec<ShoppingListEntry>,
    ) -> Self {
        Self {
            id: HistoryEntryId::generate(),
            household_id,
            session_id: None,
            planned_at: Utc::now(),
            plan_text: plan_text.into(),
            meals,
            entries,
            rating: None,
            comment: None,
            would_repeat: true,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Copy plan content from a later accept of the same session, keeping id, date and rating
    pub fn replace_plan(&mut self, other: MealHistoryEntry) {
        self.plan_text = other.plan_text;
        self.meals = other.meals;
        self.entries = other.entries;
    }

    /// Human-readable label for prompts: meal names, or the date if none were extracted
    pub fn label(&self) -> String {
        if self.meals.is_empty() {
            format!("Plan from {}", self.planned_at.format("%Y-%m-%d"))
        } else {
            self.meals.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
        }
    }
}
