//! LLM request/response types
//!
//! These types model the Anthropic Messages API but stay provider-agnostic: a system prompt, an
//! ordered list of user/assistant turns and a token budget.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ChatMessage, ChatRole};

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt; omitted from the wire request when empty
    pub system_prompt: String,

    /// Conversation turns, oldest first
    pub messages: Vec<Message>,

    /// Max tokens for response
    pub max_tokens: u32,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }

    /// Convert session chat messages into API turns
    ///
    /// System messages are not API turns; they are dropped here and belong in the system prompt.
    pub fn from_chat(messages: &[ChatMessage]) -> Vec<Self> {
        debug!(message_count = %messages.len(), "Message::from_chat: called");
        messages
            .iter()
            .filter_map(|m| match m.role {
                ChatRole::User => Some(Self::user(m.text.clone())),
                ChatRole::Assistant => Some(Self::assistant(m.text.clone())),
                ChatRole::System => None,
            })
            .collect()
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage for cost tracking
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A plain text response that ended normally
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Parse from Anthropic API stop_reason string
    pub fn from_anthropic(s: &str) -> Self {
        match s {
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage for cost tracking
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
