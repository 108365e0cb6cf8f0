//! Session domain type
//!
//! A Session is one planning conversation. It is mutated only by the planner, one transition at a
//! time, and always written back to the session store as a whole value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{HouseholdId, OfferId, SessionId};

/// Conversation state of a planning session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Freshly created, nothing asked yet
    #[default]
    Idle,
    /// Waiting for the number of meals to plan
    AskNumMeals,
    /// Waiting for free-text special requests
    AskSpecialRequests,
    /// Plan generation in flight
    Generating,
    /// A generated plan is waiting for accept or refine
    ReviewPlan,
    /// Refinement in flight
    Refining,
    /// Plan accepted; terminal
    Accepted,
}

impl SessionState {
    /// Check if the session is still collecting parameters for generation
    pub fn is_collecting(&self) -> bool {
        matches!(self, Self::Idle | Self::AskNumMeals | Self::AskSpecialRequests)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AskNumMeals => write!(f, "ask_num_meals"),
            Self::AskSpecialRequests => write!(f, "ask_special_requests"),
            Self::Generating => write!(f, "generating"),
            Self::ReviewPlan => write!(f, "review_plan"),
            Self::Refining => write!(f, "refining"),
            Self::Accepted => write!(f, "accepted"),
        }
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// A single message in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            text: text.into(),
        }
    }
}

/// Transient per-session planning parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdHocParams {
    /// Number of meals to plan
    pub num_meals: Option<u32>,

    /// Free-text requests for this plan only (already length-capped)
    pub special_requests: Option<String>,

    /// Offers the user picked as must-include items; consumed by a successful generation
    pub selected_offers: Vec<OfferId>,
}

/// One planning conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    pub household_id: HouseholdId,

    pub state: SessionState,

    /// Display/replay order of the dialogue
    pub messages: Vec<ChatMessage>,

    pub ad_hoc: AdHocParams,

    /// Latest generated plan (raw markdown)
    pub current_plan_text: Option<String>,

    /// Generator-facing conversation: assembled prompt, plans and feedback
    pub transcript: Vec<ChatMessage>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new idle session with a generated id
    pub fn new(household_id: HouseholdId) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            household_id,
            state: SessionState::Idle,
            messages: Vec::new(),
            ad_hoc: AdHocParams::default(),
            current_plan_text: None,
            transcript: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the dialogue
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Move to a new state and bump the update timestamp
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Replace the current plan and record it in the generator transcript
    pub fn replace_plan(&mut self, plan: String) {
        self.transcript.push(ChatMessage::assistant(plan.clone()));
        self.current_plan_text = Some(plan);
    }
}
