//! Plan generation over an LlmClient with retry, backoff and per-attempt timeout

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{GenerationError, GenerationErrorKind, RetryPolicy};
use crate::domain::{ChatMessage, ChatRole};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message, StopReason};

/// Opening turn used when a refinement has no recorded prompt to replay
const MISSING_PROMPT_TURN: &str = "Create a meal plan for my household.";

/// Turns prompts into plan text, hiding transport failures behind `GenerationError`
pub struct PlanGenerator {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate a fresh plan from an assembled prompt
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        debug!(prompt_len = %prompt.len(), %max_tokens, "generate: called");
        self.run(vec![Message::user(prompt)], max_tokens).await
    }

    /// Refine the previous plan by replaying the generator transcript plus new feedback
    ///
    /// The model always sees its previous plan as the last assistant turn before the feedback.
    pub async fn refine(
        &self,
        transcript: &[ChatMessage],
        previous_plan: &str,
        feedback: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        debug!(transcript_len = %transcript.len(), feedback_len = %feedback.len(), "refine: called");
        let turns = refine_transcript(transcript, previous_plan, feedback);
        self.run(Message::from_chat(&turns), max_tokens).await
    }

    async fn run(&self, messages: Vec<Message>, max_tokens: u32) -> Result<String, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%attempt, %max_attempts, "run: attempt");

            let request = CompletionRequest {
                system_prompt: String::new(),
                messages: messages.clone(),
                max_tokens,
            };

            let outcome = match tokio::time::timeout(self.policy.timeout, self.client.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.policy.timeout)),
            };

            let err = match outcome {
                Ok(response) => {
                    if response.stop_reason == StopReason::MaxTokens {
                        warn!(%max_tokens, "run: plan hit the token limit and may be truncated");
                    }
                    let text = response.content.unwrap_or_default();
                    if text.trim().is_empty() {
                        error!(%attempt, "run: empty response");
                        return Err(GenerationError::new(
                            GenerationErrorKind::InvalidResponse,
                            attempt,
                            "model returned no text",
                        ));
                    }
                    info!(%attempt, output_tokens = %response.usage.output_tokens, "run: plan generated");
                    return Ok(text.trim().to_string());
                }
                Err(e) => e,
            };

            let kind = GenerationErrorKind::from(&err);
            if !kind.is_retryable() {
                error!(%attempt, %kind, error = %err, "run: non-retryable failure");
                return Err(GenerationError::new(kind, attempt, err.to_string()));
            }
            if attempt >= max_attempts {
                warn!(%attempt, %kind, error = %err, "run: retries exhausted");
                return Err(GenerationError::new(kind, attempt, err.to_string()));
            }

            let delay = self.policy.delay(attempt, err.retry_after());
            warn!(%attempt, %kind, delay_ms = %delay.as_millis(), error = %err, "run: retrying after transient error");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// The generator-facing transcript for a refinement, ending with the feedback turn
///
/// System messages are dropped. The conversation always opens with a user turn and the previous
/// plan is the assistant turn right before the feedback.
pub fn refine_transcript(transcript: &[ChatMessage], previous_plan: &str, feedback: &str) -> Vec<ChatMessage> {
    let mut turns: Vec<ChatMessage> = transcript.iter().filter(|m| m.role != ChatRole::System).cloned().collect();

    if turns.first().is_none_or(|m| m.role != ChatRole::User) {
        turns.insert(0, ChatMessage::user(MISSING_PROMPT_TURN));
    }
    if turns
        .last()
        .is_none_or(|m| m.role != ChatRole::Assistant || m.text != previous_plan)
    {
        turns.push(ChatMessage::assistant(previous_plan));
    }
    turns.push(ChatMessage::user(feedback));
    turns
}
