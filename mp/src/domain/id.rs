//! Identifier newtypes
//!
//! Session ids use the format `{uuid-v7}`; household, offer, list and history ids are opaque strings
//! supplied by the collaborators that own those records.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the id string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Caller-visible identifier of one planning conversation
    SessionId
);

string_id!(
    /// Household that owns preferences, history and shopping lists
    HouseholdId
);

string_id!(
    /// Identifier of a scraped offer
    OfferId
);

string_id!(
    /// Identifier of a shopping list
    ShoppingListId
);

string_id!(
    /// Identifier of a meal history entry
    HistoryEntryId
);

impl SessionId {
    /// Generate a fresh, time-ordered session id
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

impl HistoryEntryId {
    /// Generate a fresh history entry id
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}
