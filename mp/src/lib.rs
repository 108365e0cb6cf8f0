//! Meal Planner - conversational weekly meal planning
//!
//! A household chats with the planner to pick the number of dinners and any special requests; a
//! generative model drafts a plan from household preferences, recent meal history and this week's
//! discount offers. Plans can be refined with free-text feedback until accepted, at which point
//! the shopping list is extracted, recorded in history and added to the household's list.
//!
//! # Modules
//!
//! - [`planner`] - Per-session conversation state machine
//! - [`prompts`] - Prompt assembly from Handlebars templates
//! - [`generation`] - Retry, backoff and timeout policy over an LLM client
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`parser`] - Shopping-list and meal extraction from plan text
//! - [`store`] - Collaborator traits and their memory/file implementations
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod generation;
pub mod llm;
pub mod parser;
pub mod planner;
pub mod prompts;
pub mod repl;
pub mod store;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{
    AdHocParams, ChatMessage, ChatRole, HouseholdId, HouseholdPreferences, MealHistoryEntry, Offer, OfferFilter,
    OfferId, PlannedMeal, Session, SessionId, SessionState, ShoppingListEntry, ShoppingListId,
};
pub use generation::{GenerationError, GenerationErrorKind, PlanGenerator, RetryPolicy};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use parser::{PlanParser, categorize_item, extract_meals};
pub use planner::{AcceptOutcome, Collaborators, Planner, PlannerError, Reply};
pub use prompts::{PromptAssembler, PromptInputs, PromptLoader};
pub use store::{
    AddSummary, HistoryStore, OffersStore, PreferencesStore, SessionStore, ShoppingListItem, ShoppingListSink,
    StoreError,
};
