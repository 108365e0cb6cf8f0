//! Plan parser
//!
//! Extracts structured shopping-list entries and planned meals from generated markdown, one
//! line at a time. Lines it cannot make sense of are skipped, never an error.

mod category;
mod meals;
mod plan;
mod units;

use thiserror::Error;

pub use category::categorize_item;
pub use meals::extract_meals;
pub use plan::PlanParser;
pub use units::UnitSet;

/// Errors building a parser from configuration
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Invalid parser pattern: {0}")]
    Pattern(#[from] regex::Error),
}
