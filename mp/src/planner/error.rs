//! Planner error types

use thiserror::Error;

use crate::domain::{SessionId, SessionState};
use crate::generation::GenerationError;
use crate::store::StoreError;

/// Errors from planner operations
///
/// Every variant leaves the stored session exactly as it was before the failed operation.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Cannot {action} while the session is in state {state}")]
    InvalidAction { action: &'static str, state: SessionState },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl PlannerError {
    pub(crate) fn invalid(action: &'static str, state: SessionState) -> Self {
        Self::InvalidAction { action, state }
    }

    /// Whether retrying the same message later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_recoverable(),
            Self::Store(_) => true,
            Self::SessionNotFound(_) | Self::InvalidAction { .. } | Self::Prompt(_) => false,
        }
    }

    /// Message suitable for showing to the person chatting
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionNotFound(_) => "That planning session no longer exists. Start a new one.".to_string(),
            Self::InvalidAction {
                state: SessionState::Accepted,
                ..
            } => "This plan is already accepted. Start a new session to plan again.".to_string(),
            Self::InvalidAction { action, state } => {
                format!("Can't {} right now (the session is at {}).", action, state)
            }
            Self::Generation(e) => e.user_message(),
            Self::Store(e) => format!("Something went wrong while saving: {}. Please try again.", e),
            Self::Prompt(_) => "Couldn't build the planning prompt. Check the prompt templates.".to_string(),
        }
    }
}
