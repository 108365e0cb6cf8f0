//! Plan generation
//!
//! Wraps an `LlmClient` with the retry, backoff and timeout policy and classifies failures into
//! retryable and non-retryable kinds.

mod error;
mod generator;
mod policy;

pub use error::{GenerationError, GenerationErrorKind};
pub use generator::{PlanGenerator, refine_transcript};
pub use policy::RetryPolicy;
