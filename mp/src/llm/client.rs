//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Multi-turn continuity is the caller's job: it replays the turns it wants the model to see in
/// `CompletionRequest::messages`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    ///
    /// Implementations make exactly one attempt; retry and timeout policy lives in
    /// `generation::PlanGenerator`.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

pub mod mock {
    //! Scripted LLM client for tests and offline runs

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    /// Replays a fixed script of responses and records every request it receives
    #[derive(Default)]
    pub struct ScriptedLlmClient {
        script: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        call_count: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedLlmClient {
        /// Client that answers with the given texts in order
        pub fn with_texts<I, S>(texts: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::with_results(texts.into_iter().map(|t| Ok(CompletionResponse::text(t))))
        }

        /// Client that replays arbitrary results, errors included
        pub fn with_results(results: impl IntoIterator<Item = Result<CompletionResponse, LlmError>>) -> Self {
            Self {
                script: Mutex::new(results.into_iter().collect()),
                ..Self::default()
            }
        }

        /// Sleep before answering each request
        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Append another result to the script
        pub fn push(&self, result: Result<CompletionResponse, LlmError>) {
            if let Ok(mut script) = self.script.lock() {
                script.push_back(result);
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Every request received so far, oldest first
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "ScriptedLlmClient::complete: called");
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
            next.unwrap_or_else(|| Err(LlmError::InvalidResponse("No more scripted responses".to_string())))
        }
    }

}
