//! Planner - the per-session conversation state machine
//!
//! Every transition runs under the session's lock, mutates a private copy of the stored session
//! and commits it with a single `SessionStore::put`. A transition that fails anywhere returns
//! before the commit, so the stored session is never half-transitioned.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{PlannerError, SessionLocks};
use crate::config::{Config, PlanningConfig};
use crate::domain::{
    ChatMessage, HistoryEntryId, HouseholdId, Offer, OfferFilter, OfferId, PlannedMeal, Session, SessionId,
    SessionState, ShoppingListEntry, ShoppingListId,
};
use crate::generation::{GenerationError, PlanGenerator, refine_transcript};
use crate::llm::LlmClient;
use crate::parser::{PlanParser, extract_meals};
use crate::prompts::{PromptAssembler, PromptInputs};
use crate::store::{
    AddSummary, HistoryStore, MemoryHistoryStore, MemoryOffersStore, MemoryPreferencesStore, MemorySessionStore,
    MemoryShoppingList, OffersStore, PreferencesStore, SessionStore, ShoppingListSink,
};

/// Replies that accept the plan under review; anything else is refinement feedback
const ACCEPT_PHRASES: &[&str] = &["accept", "yes", "looks good", "perfect", "ok", "okay"];

/// Replies meaning "no special requests"
const NO_REQUEST_WORDS: &[&str] = &["none", "no", "n"];

const EMPTY_PARSE_WARNING: &str =
    "No shopping-list items could be read from the plan. Add them to your list manually.";

const REVIEW_HINT: &str = "Reply 'accept' to save this plan, or tell me what to change.";

/// External collaborators injected into the planner
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionStore>,
    pub preferences: Arc<dyn PreferencesStore>,
    pub history: Arc<dyn HistoryStore>,
    pub offers: Arc<dyn OffersStore>,
    pub shopping_list: Arc<dyn ShoppingListSink>,
}

impl Collaborators {
    /// Everything in memory, with no offers
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(MemorySessionStore::new()),
            preferences: Arc::new(MemoryPreferencesStore::new()),
            history: Arc::new(MemoryHistoryStore::new()),
            offers: Arc::new(MemoryOffersStore::new(Vec::new())),
            shopping_list: Arc::new(MemoryShoppingList::new()),
        }
    }
}

/// Result of a message or refinement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub state: SessionState,
}

/// Result of accepting a plan
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    /// Entries parsed from the plan, exactly as handed to the shopping list
    pub entries: Vec<ShoppingListEntry>,
    pub meals: Vec<PlannedMeal>,
    pub list_id: ShoppingListId,
    pub history_entry_id: HistoryEntryId,
    pub summary: AddSummary,
    /// Soft failure such as an empty parse; acceptance still happened
    pub warning: Option<String>,
    pub reply: String,
}

/// Drives planning conversations
pub struct Planner {
    collaborators: Collaborators,
    generator: PlanGenerator,
    assembler: PromptAssembler,
    parser: PlanParser,
    planning: PlanningConfig,
    locks: SessionLocks,
}

impl Planner {
    pub fn new(
        collaborators: Collaborators,
        generator: PlanGenerator,
        assembler: PromptAssembler,
        parser: PlanParser,
        planning: PlanningConfig,
    ) -> Self {
        debug!(
            default_meals = %planning.default_meals,
            max_meals = %planning.max_meals,
            retries = %generator.policy().max_attempts,
            "Planner::new: called"
        );
        Self {
            collaborators,
            generator,
            assembler,
            parser,
            planning,
            locks: SessionLocks::new(),
        }
    }

    /// Wire a planner from config around an LLM client and collaborators
    pub fn from_config(
        config: &Config,
        client: Arc<dyn LlmClient>,
        collaborators: Collaborators,
    ) -> eyre::Result<Self> {
        let generator = PlanGenerator::new(client, config.retry.policy());
        let assembler = PromptAssembler::from_config(&config.prompts)?;
        let parser = PlanParser::from_config(&config.parser)?;
        Ok(Self::new(collaborators, generator, assembler, parser, config.planning.clone()))
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Create an idle session for a household
    pub async fn start_session(&self, household: HouseholdId) -> Result<SessionId, PlannerError> {
        let session = Session::new(household);
        let id = session.id.clone();
        info!(session_id = %id, household = %session.household_id, "Session started");
        self.collaborators.sessions.put(session).await?;
        Ok(id)
    }

    /// Read-only snapshot of a session
    pub async fn session(&self, id: &SessionId) -> Result<Session, PlannerError> {
        self.load(id).await
    }

    /// Delete a session so the household can start over
    pub async fn reset(&self, id: &SessionId) -> Result<(), PlannerError> {
        debug!(session_id = %id, "reset: called");
        let guard = self.locks.acquire(id).await;
        let removed = self.collaborators.sessions.delete(id).await?;
        drop(guard);
        self.locks.remove(id).await;

        if !removed {
            return Err(PlannerError::SessionNotFound(id.clone()));
        }
        info!(session_id = %id, "Session reset");
        Ok(())
    }

    /// Feed one user message through the state machine
    pub async fn handle_message(&self, id: &SessionId, text: &str) -> Result<Reply, PlannerError> {
        debug!(session_id = %id, text_len = %text.len(), "handle_message: called");
        let _guard = self.locks.acquire(id).await;
        let mut session = self.load(id).await?;
        let from = session.state;

        let reply = match from {
            SessionState::Idle => {
                session.push_message(ChatMessage::user(text));
                session.set_state(SessionState::AskNumMeals);
                format!(
                    "How many dinners should I plan? ({}-{}, default {})",
                    self.planning.min_meals, self.planning.max_meals, self.planning.default_meals
                )
            }
            SessionState::AskNumMeals => {
                session.push_message(ChatMessage::user(text));
                let count = self.meal_count(&session.id, text);
                session.ad_hoc.num_meals = Some(count);
                session.set_state(SessionState::AskSpecialRequests);
                format!(
                    "Planning {} dinners. Any special requests this week? (e.g. vegetarian, quick meals, use up leftovers; 'none' to skip)",
                    count
                )
            }
            SessionState::AskSpecialRequests => {
                session.push_message(ChatMessage::user(text));
                session.ad_hoc.special_requests = self.special_requests(&session.id, text);
                session.set_state(SessionState::Generating);
                self.generate_plan(&mut session).await?
            }
            SessionState::Generating => {
                debug!(session_id = %id, "handle_message: resuming interrupted generation");
                session.push_message(ChatMessage::user(text));
                self.generate_plan(&mut session).await?
            }
            SessionState::ReviewPlan | SessionState::Refining => {
                if text.trim().is_empty() {
                    return Ok(Reply {
                        text: REVIEW_HINT.to_string(),
                        state: from,
                    });
                }
                session.push_message(ChatMessage::user(text));
                if is_accept(text) {
                    self.accept_plan(&mut session).await?.reply
                } else {
                    self.refine_plan(&mut session, text).await?
                }
            }
            SessionState::Accepted => return Err(PlannerError::invalid("continue", from)),
        };

        session.push_message(ChatMessage::assistant(reply.clone()));
        let state = session.state;
        self.commit(session, from).await?;
        Ok(Reply { text: reply, state })
    }

    /// Accept the plan under review
    pub async fn accept(&self, id: &SessionId) -> Result<AcceptOutcome, PlannerError> {
        debug!(session_id = %id, "accept: called");
        let _guard = self.locks.acquire(id).await;
        let mut session = self.load(id).await?;
        let from = session.state;
        if !matches!(from, SessionState::ReviewPlan | SessionState::Refining) {
            return Err(PlannerError::invalid("accept", from));
        }

        let outcome = self.accept_plan(&mut session).await?;
        session.push_message(ChatMessage::assistant(outcome.reply.clone()));
        self.commit(session, from).await?;
        Ok(outcome)
    }

    /// Revise the plan under review with free-text feedback
    pub async fn refine(&self, id: &SessionId, feedback: &str) -> Result<Reply, PlannerError> {
        debug!(session_id = %id, feedback_len = %feedback.len(), "refine: called");
        let _guard = self.locks.acquire(id).await;
        let mut session = self.load(id).await?;
        let from = session.state;
        if !matches!(from, SessionState::ReviewPlan | SessionState::Refining) {
            return Err(PlannerError::invalid("refine", from));
        }
        if feedback.trim().is_empty() {
            return Ok(Reply {
                text: REVIEW_HINT.to_string(),
                state: from,
            });
        }

        session.push_message(ChatMessage::user(feedback));
        let plan = self.refine_plan(&mut session, feedback).await?;
        session.push_message(ChatMessage::assistant(plan.clone()));
        let state = session.state;
        self.commit(session, from).await?;
        Ok(Reply { text: plan, state })
    }

    /// Pick offers that must appear in the next generated plan
    ///
    /// Replaces any earlier selection. Unknown ids are ignored; the resolved offers are returned.
    pub async fn select_offers(&self, id: &SessionId, ids: Vec<OfferId>) -> Result<Vec<Offer>, PlannerError> {
        debug!(session_id = %id, count = %ids.len(), "select_offers: called");
        let _guard = self.locks.acquire(id).await;
        let mut session = self.load(id).await?;
        let from = session.state;
        if !from.is_collecting() {
            return Err(PlannerError::invalid("select offers", from));
        }

        let offers = if ids.is_empty() {
            Vec::new()
        } else {
            self.collaborators.offers.available(&OfferFilter::by_ids(ids.clone())).await?
        };
        let unknown: Vec<&OfferId> = ids.iter().filter(|i| !offers.iter().any(|o| &o.id == *i)).collect();
        if !unknown.is_empty() {
            warn!(session_id = %id, ?unknown, "Ignoring unknown offers");
        }

        session.ad_hoc.selected_offers = offers.iter().map(|o| o.id.clone()).collect();
        session.updated_at = Utc::now();
        self.commit(session, from).await?;
        info!(session_id = %id, selected = %offers.len(), "Offers selected");
        Ok(offers)
    }

    async fn load(&self, id: &SessionId) -> Result<Session, PlannerError> {
        self.collaborators
            .sessions
            .get(id)
            .await?
            .ok_or_else(|| PlannerError::SessionNotFound(id.clone()))
    }

    async fn commit(&self, session: Session, from: SessionState) -> Result<(), PlannerError> {
        let id = session.id.clone();
        let to = session.state;
        self.collaborators.sessions.put(session).await?;
        if from != to {
            info!(session_id = %id, %from, %to, "Session transition");
        }
        Ok(())
    }

    /// First integer in the reply, defaulted and clamped into the configured range
    fn meal_count(&self, id: &SessionId, text: &str) -> u32 {
        let min = self.planning.min_meals;
        let max = self.planning.max_meals.max(min);

        let digits: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();

        if digits.is_empty() {
            let count = self.planning.default_meals.clamp(min, max);
            warn!(session_id = %id, input = %text, %count, "No meal count in reply, using default");
            return count;
        }

        let requested = digits.parse::<u64>().unwrap_or(u64::MAX);
        let count = requested.clamp(u64::from(min), u64::from(max)) as u32;
        if u64::from(count) != requested {
            warn!(session_id = %id, %requested, %count, "Meal count out of range, clamped");
        }
        count
    }

    fn special_requests(&self, id: &SessionId, text: &str) -> Option<String> {
        let trimmed = text.trim();
        let word = trimmed.trim_end_matches(['.', '!']).to_lowercase();
        if word.is_empty() || NO_REQUEST_WORDS.contains(&word.as_str()) {
            return None;
        }
        Some(self.cap_length(id, trimmed))
    }

    fn cap_length(&self, id: &SessionId, text: &str) -> String {
        let max = self.planning.max_request_chars;
        let chars = text.chars().count();
        if chars <= max {
            return text.to_string();
        }
        warn!(session_id = %id, %chars, %max, "Request text too long, truncated");
        text.chars().take(max).collect()
    }

    /// Assemble a prompt, generate, and move to review
    async fn generate_plan(&self, session: &mut Session) -> Result<String, PlannerError> {
        let household = session.household_id.clone();
        let preferences = self.collaborators.preferences.load(&household).await?;
        let history = self
            .collaborators
            .history
            .recent(&household, self.planning.history_weeks)
            .await?;
        let selected = if session.ad_hoc.selected_offers.is_empty() {
            Vec::new()
        } else {
            let ids = session.ad_hoc.selected_offers.iter().cloned();
            self.collaborators.offers.available(&OfferFilter::by_ids(ids)).await?
        };
        let available = self.collaborators.offers.available(&OfferFilter::default()).await?;

        let prompt = self
            .assembler
            .assemble(&PromptInputs {
                preferences: &preferences,
                history: &history,
                history_weeks: self.planning.history_weeks,
                ad_hoc: &session.ad_hoc,
                selected_offers: &selected,
                available_offers: &available,
            })
            .map_err(|e| PlannerError::Prompt(format!("{:#}", e)))?;

        let plan = self
            .generator
            .generate(&prompt, self.planning.plan_max_tokens)
            .await
            .map_err(|e| self.generation_failed(session, e))?;

        session.transcript = vec![ChatMessage::user(prompt)];
        session.replace_plan(plan.clone());
        session.ad_hoc.selected_offers.clear();
        session.set_state(SessionState::ReviewPlan);
        info!(
            session_id = %session.id,
            %household,
            meals = ?session.ad_hoc.num_meals,
            selected = %selected.len(),
            "Plan generated"
        );
        Ok(plan)
    }

    /// Replay the transcript with feedback and replace the plan
    async fn refine_plan(&self, session: &mut Session, feedback: &str) -> Result<String, PlannerError> {
        let previous = session
            .current_plan_text
            .clone()
            .ok_or_else(|| PlannerError::invalid("refine", session.state))?;
        let feedback = self.cap_length(&session.id, feedback.trim());
        session.set_state(SessionState::Refining);

        let turn = self
            .assembler
            .refine_message(&feedback)
            .map_err(|e| PlannerError::Prompt(format!("{:#}", e)))?;
        let plan = self
            .generator
            .refine(&session.transcript, &previous, &turn, self.planning.plan_max_tokens)
            .await
            .map_err(|e| self.generation_failed(session, e))?;

        session.transcript = refine_transcript(&session.transcript, &previous, &turn);
        session.replace_plan(plan.clone());
        session.set_state(SessionState::ReviewPlan);
        info!(session_id = %session.id, household = %session.household_id, "Plan refined");
        Ok(plan)
    }

    /// Parse, record in history, add to the shopping list, and finish
    async fn accept_plan(&self, session: &mut Session) -> Result<AcceptOutcome, PlannerError> {
        let plan = session
            .current_plan_text
            .clone()
            .ok_or_else(|| PlannerError::invalid("accept", session.state))?;
        let household = session.household_id.clone();

        let entries = self.parser.parse(&plan);
        let meals = extract_meals(&plan);
        let warning = if entries.is_empty() {
            warn!(session_id = %session.id, %household, "Accepted plan has no readable shopping-list items");
            Some(EMPTY_PARSE_WARNING.to_string())
        } else {
            None
        };

        let history_entry = self
            .collaborators
            .history
            .append(&session.id, &household, &plan, meals.clone(), entries.clone())
            .await?;
        let list_id = self.collaborators.shopping_list.active_list(&household).await?;
        let summary = self.collaborators.shopping_list.add_entries(&list_id, &entries).await?;

        session.set_state(SessionState::Accepted);
        info!(
            session_id = %session.id,
            %household,
            history_entry = %history_entry.id,
            items = %entries.len(),
            merged = %summary.merged,
            "Plan accepted"
        );

        let reply = accept_reply(meals.len(), &summary, warning.as_deref());
        Ok(AcceptOutcome {
            entries,
            meals,
            list_id,
            history_entry_id: history_entry.id,
            summary,
            warning,
            reply,
        })
    }

    fn generation_failed(&self, session: &Session, err: GenerationError) -> PlannerError {
        if err.is_recoverable() {
            warn!(
                session_id = %session.id,
                household = %session.household_id,
                state = %session.state,
                kind = %err.kind,
                attempts = %err.attempts,
                "Generation failed, session rolled back"
            );
        } else {
            error!(
                session_id = %session.id,
                household = %session.household_id,
                state = %session.state,
                kind = %err.kind,
                error = %err.message,
                "Generation failed, session rolled back"
            );
        }
        PlannerError::Generation(err)
    }
}

/// Check if a review reply accepts the plan
pub fn is_accept(text: &str) -> bool {
    let normalized = text.trim().trim_end_matches(['.', '!']).trim().to_lowercase();
    ACCEPT_PHRASES.contains(&normalized.as_str())
}

fn accept_reply(meals: usize, summary: &AddSummary, warning: Option<&str>) -> String {
    let mut reply = if meals > 0 {
        format!("Saved your plan with {} meals.", meals)
    } else {
        "Saved your plan.".to_string()
    };
    reply.push_str(&format!(" Added {} new items to your shopping list", summary.inserted));
    if summary.merged > 0 {
        reply.push_str(&format!(" and updated {} existing ones", summary.merged));
    }
    reply.push('.');
    if let Some(warning) = warning {
        reply.push('\n');
        reply.push_str(warning);
    }
    reply
}
