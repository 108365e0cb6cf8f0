//! Integration tests for the meal planner
//!
//! These drive whole conversations through the Planner with a scripted LLM client and in-memory
//! collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;

use mealplanner::config::PlanningConfig;
use mealplanner::domain::{
    ChatMessage, HouseholdId, MealHistoryEntry, Offer, OfferId, PlannedMeal, Session, SessionState,
    ShoppingListEntry, ShoppingListId,
};
use mealplanner::generation::{GenerationErrorKind, PlanGenerator, RetryPolicy};
use mealplanner::llm::mock::ScriptedLlmClient;
use mealplanner::llm::{CompletionResponse, LlmError, Role};
use mealplanner::parser::PlanParser;
use mealplanner::planner::{Collaborators, Planner, PlannerError};
use mealplanner::prompts::{PromptAssembler, PromptLoader};
use mealplanner::store::{
    AddSummary, MemoryHistoryStore, MemoryOffersStore, MemoryPreferencesStore, MemorySessionStore, MemoryShoppingList,
    SessionStore, ShoppingListItem, ShoppingListSink, StoreError,
};

const PLAN: &str = "## Meal Plan

Day 1: Chicken stir-fry
Day 2: Veggie tacos
Day 3: Salmon with potatoes

## Shopping List

### Produce
- 1 kg Tomatoes (19,95 kr)
- 2 Onions
- 1 head Lettuce (12,95 kr)

### Dairy
- 2 l Milk (14,95 kr)

### Meat & Fish
- 800 g Chicken breast (59,95 kr)
- 400 g Salmon (69,95 kr)";

const PLAN_NO_FISH: &str = "## Meal Plan

Day 1: Chicken stir-fry
Day 2: Veggie tacos
Day 3: Lentil curry

## Shopping List

### Produce
- 1 kg Tomatoes (19,95 kr)

### Pantry
- 500 g Red lentils (15,95 kr)";

fn timeout() -> Result<CompletionResponse, LlmError> {
    Err(LlmError::Timeout(Duration::from_secs(60)))
}

struct Harness {
    planner: Arc<Planner>,
    client: Arc<ScriptedLlmClient>,
    sessions: Arc<MemorySessionStore>,
    history: Arc<MemoryHistoryStore>,
    shopping: Arc<MemoryShoppingList>,
}

fn harness_with(client: ScriptedLlmClient, offers: Vec<Offer>, sink: Option<Arc<dyn ShoppingListSink>>) -> Harness {
    let client = Arc::new(client);
    let sessions = Arc::new(MemorySessionStore::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let shopping = Arc::new(MemoryShoppingList::new());

    let collaborators = Collaborators {
        sessions: sessions.clone(),
        preferences: Arc::new(MemoryPreferencesStore::new()),
        history: history.clone(),
        offers: Arc::new(MemoryOffersStore::new(offers)),
        shopping_list: sink.unwrap_or_else(|| shopping.clone() as Arc<dyn ShoppingListSink>),
    };
    let planner = Planner::new(
        collaborators,
        PlanGenerator::new(client.clone(), RetryPolicy::immediate()),
        PromptAssembler::new(PromptLoader::embedded_only().expect("embedded templates"), 20),
        PlanParser::new().expect("parser patterns"),
        PlanningConfig::default(),
    );

    Harness {
        planner: Arc::new(planner),
        client,
        sessions,
        history,
        shopping,
    }
}

fn harness(client: ScriptedLlmClient) -> Harness {
    harness_with(client, Vec::new(), None)
}

fn home() -> HouseholdId {
    HouseholdId::new("home")
}

/// Drive a fresh session up to the special-requests question
async fn session_at_special_requests(h: &Harness) -> mealplanner::domain::SessionId {
    let id = h.planner.start_session(home()).await.unwrap();
    h.planner.handle_message(&id, "hi").await.unwrap();
    h.planner.handle_message(&id, "3").await.unwrap();
    id
}

/// Drive a fresh session up to plan review
async fn session_at_review(h: &Harness) -> mealplanner::domain::SessionId {
    let id = session_at_special_requests(h).await;
    let reply = h.planner.handle_message(&id, "none").await.unwrap();
    assert_eq!(reply.state, SessionState::ReviewPlan);
    id
}

// =============================================================================
// Parameter collection
// =============================================================================

#[tokio::test]
async fn test_meal_count_reply() {
    let h = harness(ScriptedLlmClient::default());
    let id = h.planner.start_session(home()).await.unwrap();
    h.planner.handle_message(&id, "hello").await.unwrap();

    let reply = h.planner.handle_message(&id, "5").await.unwrap();
    assert_eq!(reply.state, SessionState::AskSpecialRequests);

    let session = h.planner.session(&id).await.unwrap();
    assert_eq!(session.ad_hoc.num_meals, Some(5));
    assert_eq!(session.state, SessionState::AskSpecialRequests);
}

#[tokio::test]
async fn test_meal_count_without_number_uses_default() {
    let h = harness(ScriptedLlmClient::default());
    let id = h.planner.start_session(home()).await.unwrap();
    h.planner.handle_message(&id, "hello").await.unwrap();

    let reply = h.planner.handle_message(&id, "a bunch").await.unwrap();
    assert_eq!(reply.state, SessionState::AskSpecialRequests);
    assert_eq!(h.planner.session(&id).await.unwrap().ad_hoc.num_meals, Some(7));
}

#[tokio::test]
async fn test_meal_count_is_clamped() {
    let h = harness(ScriptedLlmClient::default());
    let id = h.planner.start_session(home()).await.unwrap();
    h.planner.handle_message(&id, "hello").await.unwrap();
    h.planner.handle_message(&id, "give me 40 dinners").await.unwrap();

    assert_eq!(h.planner.session(&id).await.unwrap().ad_hoc.num_meals, Some(14));
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test]
async fn test_generation_seeds_review() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let id = session_at_special_requests(&h).await;

    let reply = h.planner.handle_message(&id, "vegetarian on Monday").await.unwrap();
    assert_eq!(reply.state, SessionState::ReviewPlan);
    assert_eq!(reply.text, PLAN);

    let session = h.planner.session(&id).await.unwrap();
    assert_eq!(session.current_plan_text.as_deref(), Some(PLAN));
    assert_eq!(session.transcript.len(), 2);
    assert_eq!(session.transcript[1], ChatMessage::assistant(PLAN));

    let request = &h.client.requests()[0];
    assert_eq!(request.messages.len(), 1);
    assert!(request.messages[0].content.contains("Number of dinners: 3"));
    assert!(request.messages[0].content.contains("vegetarian on Monday"));
    assert_eq!(session.transcript[0].text, request.messages[0].content);
}

#[tokio::test]
async fn test_three_timeouts_roll_back_generation() {
    let h = harness(ScriptedLlmClient::with_results([timeout(), timeout(), timeout()]));
    let id = session_at_special_requests(&h).await;
    let before = h.planner.session(&id).await.unwrap();

    let err = h.planner.handle_message(&id, "none").await.unwrap_err();
    match &err {
        PlannerError::Generation(e) => {
            assert_eq!(e.kind, GenerationErrorKind::Timeout);
            assert_eq!(e.attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_recoverable());
    assert!(err.user_message().contains("try again"));

    let after = h.planner.session(&id).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.state, SessionState::AskSpecialRequests);
    assert!(after.current_plan_text.is_none());
    assert_eq!(h.client.call_count(), 3);
}

#[tokio::test]
async fn test_three_timeouts_during_refine_keep_plan() {
    let h = harness(ScriptedLlmClient::with_results([
        Ok(CompletionResponse::text(PLAN)),
        timeout(),
        timeout(),
        timeout(),
    ]));
    let id = session_at_review(&h).await;
    let before = h.planner.session(&id).await.unwrap();

    let err = h.planner.handle_message(&id, "no fish please").await.unwrap_err();
    assert!(err.is_recoverable());

    let after = h.planner.session(&id).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.state, SessionState::ReviewPlan);
    assert_eq!(after.current_plan_text.as_deref(), Some(PLAN));
}

#[tokio::test]
async fn test_retry_then_success() {
    let h = harness(ScriptedLlmClient::with_results([
        Err(LlmError::RateLimited {
            retry_after: Duration::ZERO,
        }),
        Ok(CompletionResponse::text(PLAN)),
    ]));
    let id = session_at_special_requests(&h).await;

    let reply = h.planner.handle_message(&id, "none").await.unwrap();
    assert_eq!(reply.state, SessionState::ReviewPlan);
    assert_eq!(h.client.call_count(), 2);
}

#[tokio::test]
async fn test_auth_failure_is_not_recoverable() {
    let h = harness(ScriptedLlmClient::with_results([
        Err(LlmError::ApiError {
            status: 401,
            message: "invalid x-api-key".to_string(),
        }),
        Ok(CompletionResponse::text(PLAN)),
    ]));
    let id = session_at_special_requests(&h).await;

    let err = h.planner.handle_message(&id, "none").await.unwrap_err();
    assert!(!err.is_recoverable());
    assert!(err.user_message().contains("API key"));
    assert_eq!(h.client.call_count(), 1);
    assert_eq!(
        h.planner.session(&id).await.unwrap().state,
        SessionState::AskSpecialRequests
    );
}

// =============================================================================
// Review: refine and accept
// =============================================================================

#[tokio::test]
async fn test_refine_replays_transcript() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN, PLAN_NO_FISH, PLAN]));
    let id = session_at_review(&h).await;

    let reply = h.planner.handle_message(&id, "no fish this week").await.unwrap();
    assert_eq!(reply.state, SessionState::ReviewPlan);
    assert_eq!(reply.text, PLAN_NO_FISH);

    let requests = h.client.requests();
    let prompt = requests[0].messages[0].content.clone();
    let sent = &requests[1].messages;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].content, prompt);
    assert_eq!(sent[1].role, Role::Assistant);
    assert_eq!(sent[1].content, PLAN);
    assert_eq!(sent[2].role, Role::User);
    assert!(sent[2].content.contains("no fish this week"));

    // A second round carries the whole conversation
    let reply = h.planner.refine(&id, "add salmon back").await.unwrap();
    assert_eq!(reply.text, PLAN);
    let sent = &h.client.requests()[2].messages;
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[3].content, PLAN_NO_FISH);
    assert!(sent[4].content.contains("add salmon back"));

    let session = h.planner.session(&id).await.unwrap();
    assert_eq!(session.transcript.len(), 6);
    assert_eq!(session.current_plan_text.as_deref(), Some(PLAN));
}

#[tokio::test]
async fn test_accept_records_history_and_shopping_list() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let id = session_at_review(&h).await;

    let outcome = h.planner.accept(&id).await.unwrap();
    let parsed = PlanParser::new().unwrap().parse(PLAN);
    assert_eq!(outcome.entries, parsed);
    assert_eq!(outcome.entries.len(), 6);
    assert!(outcome.warning.is_none());
    assert_eq!(outcome.meals.len(), 3);
    assert_eq!(outcome.summary.inserted, 6);

    let history = h.history.all(&home()).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, outcome.history_entry_id);
    assert_eq!(history[0].plan_text, PLAN);
    assert_eq!(history[0].entries, parsed);
    assert_eq!(
        history[0].meals[2],
        PlannedMeal {
            day: 3,
            name: "Salmon with potatoes".to_string()
        }
    );

    let items = h.shopping.items(&outcome.list_id).await.unwrap();
    let entries: Vec<ShoppingListEntry> = items.into_iter().map(|i| i.entry).collect();
    assert_eq!(entries, parsed);

    let session = h.planner.session(&id).await.unwrap();
    assert_eq!(session.state, SessionState::Accepted);

    // Accepting twice is invalid and changes nothing
    let err = h.planner.accept(&id).await.unwrap_err();
    assert!(matches!(
        err,
        PlannerError::InvalidAction {
            state: SessionState::Accepted,
            ..
        }
    ));
    assert!(matches!(
        h.planner.handle_message(&id, "accept").await,
        Err(PlannerError::InvalidAction { .. })
    ));
    assert_eq!(h.history.all(&home()).await.len(), 1);
    assert_eq!(h.planner.session(&id).await.unwrap(), session);
}

#[tokio::test]
async fn test_accept_keyword_in_chat() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let id = session_at_review(&h).await;

    let reply = h.planner.handle_message(&id, "Looks good!").await.unwrap();
    assert_eq!(reply.state, SessionState::Accepted);
    assert!(reply.text.contains("3 meals"));
    assert_eq!(h.client.call_count(), 1);
}

#[tokio::test]
async fn test_accept_merges_with_existing_list() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let list = h.shopping.active_list(&home()).await.unwrap();
    h.shopping
        .add_entries(
            &list,
            &[ShoppingListEntry {
                name: "tomatoes".to_string(),
                quantity: Some("2".to_string()),
                unit: Some("kg".to_string()),
                category: Some("Produce".to_string()),
                price_estimate: None,
            }],
        )
        .await
        .unwrap();
    let id = session_at_review(&h).await;

    let outcome = h.planner.accept(&id).await.unwrap();
    assert_eq!(outcome.list_id, list);
    assert_eq!(outcome.summary, AddSummary { inserted: 5, merged: 1 });

    let items = h.shopping.items(&list).await.unwrap();
    assert_eq!(items.len(), 6);
    assert_eq!(items[0].entry.quantity.as_deref(), Some("3"));
    assert_eq!(items[0].entry.unit.as_deref(), Some("kg"));
}

#[tokio::test]
async fn test_accept_unparseable_plan_warns() {
    let h = harness(ScriptedLlmClient::with_texts(["Just cook whatever is in the fridge."]));
    let id = session_at_review(&h).await;

    let outcome = h.planner.accept(&id).await.unwrap();
    assert!(outcome.entries.is_empty());
    assert!(outcome.warning.is_some());
    assert!(outcome.reply.contains("manually"));
    assert_eq!(h.history.all(&home()).await.len(), 1);
    assert_eq!(
        h.planner.session(&id).await.unwrap().state,
        SessionState::Accepted
    );
}

// =============================================================================
// Invalid actions and failures
// =============================================================================

#[tokio::test]
async fn test_invalid_actions_leave_session_unchanged() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let id = h.planner.start_session(home()).await.unwrap();
    h.planner.handle_message(&id, "hi").await.unwrap();
    let before = h.planner.session(&id).await.unwrap();

    assert!(matches!(
        h.planner.accept(&id).await,
        Err(PlannerError::InvalidAction {
            state: SessionState::AskNumMeals,
            ..
        })
    ));
    assert!(matches!(
        h.planner.refine(&id, "more fish").await,
        Err(PlannerError::InvalidAction { .. })
    ));
    assert_eq!(h.planner.session(&id).await.unwrap(), before);

    let id = session_at_review(&h).await;
    let before = h.planner.session(&id).await.unwrap();
    assert!(matches!(
        h.planner.select_offers(&id, vec![OfferId::new("1")]).await,
        Err(PlannerError::InvalidAction { .. })
    ));
    assert_eq!(h.planner.session(&id).await.unwrap(), before);
}

#[tokio::test]
async fn test_unknown_session() {
    let h = harness(ScriptedLlmClient::default());
    let id = mealplanner::domain::SessionId::new("missing");

    assert!(matches!(
        h.planner.handle_message(&id, "hi").await,
        Err(PlannerError::SessionNotFound(_))
    ));
    assert!(matches!(h.planner.accept(&id).await, Err(PlannerError::SessionNotFound(_))));
}

/// Shopping list whose writes always fail
struct BrokenShoppingList;

#[async_trait]
impl ShoppingListSink for BrokenShoppingList {
    async fn active_list(&self, household: &HouseholdId) -> Result<ShoppingListId, StoreError> {
        Ok(ShoppingListId::new(format!("{}-active", household)))
    }

    async fn add_entries(&self, _list: &ShoppingListId, _entries: &[ShoppingListEntry]) -> Result<AddSummary, StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    async fn items(&self, _list: &ShoppingListId) -> Result<Vec<ShoppingListItem>, StoreError> {
        Ok(Vec::new())
    }

    async fn check(&self, _list: &ShoppingListId, _name: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_store_failure_leaves_session_in_review() {
    let h = harness_with(
        ScriptedLlmClient::with_texts([PLAN]),
        Vec::new(),
        Some(Arc::new(BrokenShoppingList)),
    );
    let id = session_at_review(&h).await;
    let before = h.planner.session(&id).await.unwrap();

    let err = h.planner.accept(&id).await.unwrap_err();
    assert!(matches!(err, PlannerError::Store(_)));
    assert!(err.is_recoverable());
    assert_eq!(h.planner.session(&id).await.unwrap(), before);
}

/// Fails the first write, then behaves like an in-memory list
struct FlakyShoppingList {
    failed: AtomicBool,
    inner: MemoryShoppingList,
}

#[async_trait]
impl ShoppingListSink for FlakyShoppingList {
    async fn active_list(&self, household: &HouseholdId) -> Result<ShoppingListId, StoreError> {
        self.inner.active_list(household).await
    }

    async fn add_entries(&self, list: &ShoppingListId, entries: &[ShoppingListEntry]) -> Result<AddSummary, StoreError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("connection reset")));
        }
        self.inner.add_entries(list, entries).await
    }

    async fn items(&self, list: &ShoppingListId) -> Result<Vec<ShoppingListItem>, StoreError> {
        self.inner.items(list).await
    }

    async fn check(&self, list: &ShoppingListId, name: &str) -> Result<bool, StoreError> {
        self.inner.check(list, name).await
    }
}

#[tokio::test]
async fn test_accept_retry_after_store_failure_records_history_once() {
    let h = harness_with(
        ScriptedLlmClient::with_texts([PLAN]),
        Vec::new(),
        Some(Arc::new(FlakyShoppingList {
            failed: AtomicBool::new(false),
            inner: MemoryShoppingList::new(),
        })),
    );
    let id = session_at_review(&h).await;

    assert!(h.planner.accept(&id).await.is_err());
    assert_eq!(h.planner.session(&id).await.unwrap().state, SessionState::ReviewPlan);

    let outcome = h.planner.accept(&id).await.unwrap();
    let history = h.history.all(&home()).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, outcome.history_entry_id);
    assert_eq!(history[0].session_id.as_ref(), Some(&id));
    assert_eq!(h.planner.session(&id).await.unwrap().state, SessionState::Accepted);
}

// =============================================================================
// Resumed states
// =============================================================================

#[tokio::test]
async fn test_generating_at_rest_resumes() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let mut session = Session::new(home());
    session.ad_hoc.num_meals = Some(4);
    session.set_state(SessionState::Generating);
    let id = session.id.clone();
    h.sessions.put(session).await.unwrap();

    let reply = h.planner.handle_message(&id, "are you there?").await.unwrap();
    assert_eq!(reply.state, SessionState::ReviewPlan);
    assert!(h.client.requests()[0].messages[0].content.contains("Number of dinners: 4"));
}

#[tokio::test]
async fn test_refining_at_rest_is_review() {
    let h = harness(ScriptedLlmClient::default());
    let mut session = Session::new(home());
    session.transcript = vec![ChatMessage::user("prompt")];
    session.replace_plan(PLAN.to_string());
    session.set_state(SessionState::Refining);
    let id = session.id.clone();
    h.sessions.put(session).await.unwrap();

    let outcome = h.planner.accept(&id).await.unwrap();
    assert_eq!(outcome.entries.len(), 6);
}

// =============================================================================
// Offers and history in prompts
// =============================================================================

fn offer(id: &str, name: &str, department: &str) -> Offer {
    Offer {
        id: OfferId::new(id),
        name: name.to_string(),
        underline: None,
        price: "29,95 kr".to_string(),
        price_numeric: Some(29.95),
        normal_price: Some(39.95),
        savings_percent: Some(25.0),
        department: department.to_string(),
    }
}

#[tokio::test]
async fn test_selected_offers_reach_prompt_and_are_consumed() {
    let offers = vec![
        offer("101", "Salmon fillet", "Meat & Fish"),
        offer("102", "Broccoli", "Produce"),
    ];
    let h = harness_with(ScriptedLlmClient::with_texts([PLAN]), offers, None);
    let id = h.planner.start_session(home()).await.unwrap();

    let selected = h
        .planner
        .select_offers(&id, vec![OfferId::new("101"), OfferId::new("999")])
        .await
        .unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name, "Salmon fillet");

    h.planner.handle_message(&id, "hi").await.unwrap();
    h.planner.handle_message(&id, "3").await.unwrap();
    h.planner.handle_message(&id, "none").await.unwrap();

    let prompt = h.client.requests()[0].messages[0].content.clone();
    assert!(prompt.contains("MUST-INCLUDE"));
    assert!(prompt.contains("  - Salmon fillet (Price: 29,95 kr)"));
    assert!(prompt.contains("## Produce (1 items available)"));

    let session = h.planner.session(&id).await.unwrap();
    assert!(session.ad_hoc.selected_offers.is_empty());
}

#[tokio::test]
async fn test_rated_history_reaches_prompt() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let mut entry = MealHistoryEntry::new(
        home(),
        "old plan",
        vec![PlannedMeal {
            day: 1,
            name: "Fish pie".to_string(),
        }],
        Vec::new(),
    );
    entry.planned_at = Utc::now() - chrono::Duration::days(7);
    entry.rating = Some(5);
    h.history.insert(entry).await;

    session_at_review(&h).await;
    let prompt = h.client.requests()[0].messages[0].content.clone();
    assert!(prompt.contains("Fish pie"));
    assert!(!prompt.contains("No rated meals yet"));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_messages_do_not_interleave() {
    let client = ScriptedLlmClient::with_texts([PLAN]).delayed(Duration::from_millis(50));
    let h = harness(client);
    let id = session_at_special_requests(&h).await;

    // The first message is still generating when the second arrives
    let (first, second) = tokio::join!(
        h.planner.handle_message(&id, "none"),
        h.planner.handle_message(&id, "accept")
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.state, SessionState::ReviewPlan);
    assert_eq!(second.state, SessionState::Accepted);
    assert_eq!(h.client.call_count(), 1);
    assert_eq!(h.history.all(&home()).await.len(), 1);
}

#[tokio::test]
async fn test_queued_messages_apply_in_arrival_order() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let id = h.planner.start_session(home()).await.unwrap();

    let replies = join_all(["hi", "4", "no"].map(|text| h.planner.handle_message(&id, text))).await;
    let states: Vec<SessionState> = replies.into_iter().map(|r| r.unwrap().state).collect();
    assert_eq!(
        states,
        vec![
            SessionState::AskNumMeals,
            SessionState::AskSpecialRequests,
            SessionState::ReviewPlan
        ]
    );

    let session = h.planner.session(&id).await.unwrap();
    assert_eq!(session.ad_hoc.num_meals, Some(4));
    assert_eq!(session.ad_hoc.special_requests, None);
    assert_eq!(session.messages.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sessions_run_independently() {
    let texts: Vec<&str> = std::iter::repeat_n(PLAN, 8).collect();
    let h = harness(ScriptedLlmClient::with_texts(texts).delayed(Duration::from_millis(10)));

    let handles = (0..8).map(|i| {
        let planner = h.planner.clone();
        tokio::spawn(async move {
            let id = planner
                .start_session(HouseholdId::new(format!("house-{}", i)))
                .await
                .unwrap();
            planner.handle_message(&id, "hi").await.unwrap();
            planner.handle_message(&id, "2").await.unwrap();
            planner.handle_message(&id, "none").await.unwrap();
            planner.accept(&id).await.unwrap()
        })
    });

    let outcomes: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(outcomes.len(), 8);
    assert_eq!(h.client.call_count(), 8);
    for i in 0..8 {
        assert_eq!(h.history.all(&HouseholdId::new(format!("house-{}", i))).await.len(), 1);
    }
}

// =============================================================================
// Reset
// =============================================================================

#[tokio::test]
async fn test_reset_starts_over() {
    let h = harness(ScriptedLlmClient::with_texts([PLAN]));
    let id = session_at_review(&h).await;

    h.planner.reset(&id).await.unwrap();
    assert!(matches!(h.planner.session(&id).await, Err(PlannerError::SessionNotFound(_))));
    assert!(h.sessions.is_empty().await);

    let fresh = h.planner.start_session(home()).await.unwrap();
    assert_ne!(fresh, id);
    assert_eq!(
        h.planner.session(&fresh).await.unwrap().state,
        SessionState::Idle
    );
}
