//! Household preferences document
//!
//! One document per household with nested sections. Every field has a default so partial
//! documents deserialize cleanly.

use serde::{Deserialize, Serialize};

/// Persistent household preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdPreferences {
    /// Who is eating
    pub family: FamilyPreferences,

    /// How the household likes to cook
    pub cooking: CookingPreferences,

    /// Likes, dislikes and restrictions
    pub food: FoodPreferences,

    /// Planning rules
    pub planning: PlanningPreferences,
}

/// Family composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyPreferences {
    pub size: u32,
    pub composition: String,
    pub note: Option<String>,
}

impl Default for FamilyPreferences {
    fn default() -> Self {
        Self {
            size: 4,
            composition: "2 adults, 2 kids".to_string(),
            note: None,
        }
    }
}

/// Cooking style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookingPreferences {
    pub style: String,
    pub priorities: Vec<String>,
    /// Maximum cooking time in minutes
    pub max_cook_time: u32,
}

impl Default for CookingPreferences {
    fn default() -> Self {
        Self {
            style: "Simple food with fewer ingredients".to_string(),
            priorities: vec!["Fast".to_string(), "Healthy".to_string(), "Cheap".to_string()],
            max_cook_time: 30,
        }
    }
}

/// Food likes and dislikes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodPreferences {
    pub favorites: Vec<String>,
    pub dislikes: Vec<String>,
    pub dietary_restrictions: Vec<String>,
}

/// Planning constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningPreferences {
    pub default_dinners: u32,
    pub variety_rule: String,
    /// Weekly budget in the household currency
    pub max_budget: Option<f64>,
}

impl Default for PlanningPreferences {
    fn default() -> Self {
        Self {
            default_dinners: 7,
            variety_rule: "No protein repeated 2 days in a row".to_string(),
            max_budget: None,
        }
    }
}
