//! Generation error classification

use thiserror::Error;

use crate::llm::LlmError;

/// Coarse classification of a failed generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// An attempt exceeded the per-attempt timeout
    Timeout,
    /// The service asked us to slow down
    RateLimited,
    /// 5xx, overload or network failure
    Unavailable,
    /// Credentials missing or rejected
    Auth,
    /// The service rejected the request itself
    MalformedRequest,
    /// The service answered with something unusable, empty output included
    InvalidResponse,
}

impl GenerationErrorKind {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::Unavailable)
    }
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Auth => write!(f, "auth"),
            Self::MalformedRequest => write!(f, "malformed_request"),
            Self::InvalidResponse => write!(f, "invalid_response"),
        }
    }
}

impl From<&LlmError> for GenerationErrorKind {
    fn from(err: &LlmError) -> Self {
        match err {
            LlmError::RateLimited { .. } => Self::RateLimited,
            LlmError::Timeout(_) => Self::Timeout,
            LlmError::Network(_) => Self::Unavailable,
            LlmError::ApiError { status, .. } => match *status {
                401 | 403 => Self::Auth,
                408 => Self::Timeout,
                429 => Self::RateLimited,
                s if s == 529 || s >= 500 => Self::Unavailable,
                _ => Self::MalformedRequest,
            },
            LlmError::InvalidResponse(_) | LlmError::Json(_) => Self::InvalidResponse,
            LlmError::Config(_) => Self::Auth,
        }
    }
}

/// A generation that failed after all permitted attempts
#[derive(Debug, Clone, Error)]
#[error("Generation failed ({kind}) after {attempts} attempt(s): {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub attempts: u32,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, attempts: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            attempts,
            message: message.into(),
        }
    }

    /// Whether the user can simply try again later
    pub fn is_recoverable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Message suitable for showing to the person chatting
    pub fn user_message(&self) -> String {
        match self.kind {
            GenerationErrorKind::Timeout | GenerationErrorKind::RateLimited | GenerationErrorKind::Unavailable => {
                format!(
                    "The meal plan service is busy right now (gave up after {} attempts). Please try again in a moment.",
                    self.attempts
                )
            }
            GenerationErrorKind::Auth => {
                "The meal plan service rejected our credentials. Check the API key configuration.".to_string()
            }
            GenerationErrorKind::MalformedRequest => {
                "The meal plan service could not handle this request. Try shorter or simpler wishes.".to_string()
            }
            GenerationErrorKind::InvalidResponse => {
                "The meal plan service returned an unusable answer. Please try again.".to_string()
            }
        }
    }
}
