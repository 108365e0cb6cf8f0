//! Domain types for meal planning
//!
//! Sessions are owned by the planner; preferences, offers, history and shopping lists belong to
//! external collaborators and are only read or appended through the `store` traits.

mod entry;
mod id;
mod offer;
mod preferences;
mod session;

pub use entry::{MealHistoryEntry, PlannedMeal, ShoppingListEntry};
pub use id::{HistoryEntryId, HouseholdId, OfferId, SessionId, ShoppingListId};
pub use offer::{Offer, OfferFilter};
pub use preferences::{
    CookingPreferences, FamilyPreferences, FoodPreferences, HouseholdPreferences, PlanningPreferences,
};
pub use session::{AdHocParams, ChatMessage, ChatRole, Session, SessionState};
