//! Prompt assembly
//!
//! Turns preferences, history, session parameters and offers into the generation prompt. Assembly
//! is a pure function of its inputs: no I/O, no clock and every map-backed collection is sorted.

use std::collections::{BTreeMap, BTreeSet};

use eyre::Result;
use serde::Serialize;
use tracing::debug;

use super::PromptLoader;
use crate::config::PromptsConfig;
use crate::domain::{AdHocParams, HouseholdPreferences, MealHistoryEntry, Offer};

/// Most recent meal names listed in the history section
const MAX_RECENT_MEALS: usize = 15;

/// Most favourites and recent ratings listed in the history section
const MAX_RATED_ENTRIES: usize = 10;

/// Everything a prompt is built from, fetched by the caller beforehand
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub preferences: &'a HouseholdPreferences,
    /// History window, already limited to `history_weeks`
    pub history: &'a [MealHistoryEntry],
    pub history_weeks: u32,
    pub ad_hoc: &'a AdHocParams,
    /// Offers resolved from `ad_hoc.selected_offers`
    pub selected_offers: &'a [Offer],
    pub available_offers: &'a [Offer],
}

/// Builds generation prompts from `PromptInputs`
pub struct PromptAssembler {
    loader: PromptLoader,
    offers_per_category: usize,
}

impl PromptAssembler {
    pub fn new(loader: PromptLoader, offers_per_category: usize) -> Self {
        Self {
            loader,
            offers_per_category,
        }
    }

    /// Build an assembler from config, resolving template overrides now
    pub fn from_config(config: &PromptsConfig) -> Result<Self> {
        let loader = PromptLoader::new(config.dir.as_deref())?;
        Ok(Self::new(loader, config.offers_per_category))
    }

    /// Assemble the full generation prompt
    pub fn assemble(&self, inputs: &PromptInputs<'_>) -> Result<String> {
        debug!(
            history = %inputs.history.len(),
            selected = %inputs.selected_offers.len(),
            available = %inputs.available_offers.len(),
            "assemble: called"
        );
        let view = PlanPromptView::build(inputs, self.offers_per_category);
        self.loader.render("meal-plan", &view)
    }

    /// The user turn that asks for a revision
    pub fn refine_message(&self, feedback: &str) -> Result<String> {
        debug!(feedback_len = %feedback.len(), "refine_message: called");
        self.loader.render("refine", &serde_json::json!({ "feedback": feedback }))
    }
}

#[derive(Debug, Serialize)]
struct PlanPromptView<'a> {
    prefs: &'a HouseholdPreferences,
    priorities: String,
    restrictions: String,
    budget: Option<String>,
    history: HistoryView,
    num_meals: u32,
    special_requests: Option<&'a str>,
    selected_offers: Vec<String>,
    departments: Vec<DepartmentView>,
}

#[derive(Debug, Serialize)]
struct HistoryView {
    weeks: u32,
    is_empty: bool,
    recent: Vec<String>,
    favorites: Vec<String>,
    avoid: Vec<String>,
    ratings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DepartmentView {
    name: String,
    total: usize,
    lines: Vec<String>,
    hidden: usize,
}

impl<'a> PlanPromptView<'a> {
    fn build(inputs: &PromptInputs<'a>, offers_per_category: usize) -> Self {
        let prefs = inputs.preferences;
        Self {
            prefs,
            priorities: prefs.cooking.priorities.join(", "),
            restrictions: prefs.food.dietary_restrictions.join(", "),
            budget: prefs.planning.max_budget.map(|b| format!("{:.0}", b)),
            history: HistoryView::build(inputs.history, inputs.history_weeks),
            num_meals: inputs.ad_hoc.num_meals.unwrap_or(prefs.planning.default_dinners),
            special_requests: inputs.ad_hoc.special_requests.as_deref(),
            selected_offers: inputs.selected_offers.iter().map(selected_offer_line).collect(),
            departments: group_offers(inputs.available_offers, offers_per_category),
        }
    }
}

impl HistoryView {
    fn build(history: &[MealHistoryEntry], weeks: u32) -> Self {
        // Newest first, id as tie-breaker
        let mut entries: Vec<&MealHistoryEntry> = history.iter().collect();
        entries.sort_by(|a, b| {
            b.planned_at
                .cmp(&a.planned_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        let recent: BTreeSet<&str> = entries
            .iter()
            .flat_map(|e| e.meals.iter().map(|m| m.name.as_str()))
            .collect();

        let mut favorites: Vec<&MealHistoryEntry> = entries
            .iter()
            .copied()
            .filter(|e| e.would_repeat && e.rating.is_some_and(|r| r >= 4))
            .collect();
        favorites.sort_by(|a, b| b.rating.cmp(&a.rating));

        let avoid = entries.iter().filter(|e| e.rating.is_some_and(|r| r <= 2));
        let rated = entries.iter().filter(|e| e.rating.is_some());

        Self {
            weeks,
            is_empty: history.is_empty(),
            recent: recent.into_iter().take(MAX_RECENT_MEALS).map(str::to_string).collect(),
            favorites: favorites
                .iter()
                .take(MAX_RATED_ENTRIES)
                .map(|e| {
                    with_note(
                        format!("{} (rated {}/5, last: {})", e.label(), e.rating.unwrap_or(0), date(e)),
                        "Note",
                        e.comment.as_deref(),
                    )
                })
                .collect(),
            avoid: avoid
                .map(|e| {
                    with_note(
                        format!("{} (rated {}/5)", e.label(), e.rating.unwrap_or(0)),
                        "Reason",
                        e.comment.as_deref(),
                    )
                })
                .collect(),
            ratings: rated
                .take(MAX_RATED_ENTRIES)
                .map(|e| {
                    let repeat = if e.would_repeat { "would repeat" } else { "would not repeat" };
                    with_note(
                        format!("{} (rated {}/5, {}) - {}", e.label(), e.rating.unwrap_or(0), repeat, date(e)),
                        "Comment",
                        e.comment.as_deref(),
                    )
                })
                .collect(),
        }
    }
}

fn date(entry: &MealHistoryEntry) -> String {
    entry.planned_at.format("%Y-%m-%d").to_string()
}

fn with_note(line: String, label: &str, note: Option<&str>) -> String {
    match note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{}\n  {}: {}", line, label, note),
        None => line,
    }
}

fn selected_offer_line(offer: &Offer) -> String {
    match &offer.underline {
        Some(underline) => format!("{} - {} (Price: {})", offer.name, underline, offer.price),
        None => format!("{} (Price: {})", offer.name, offer.price),
    }
}

fn offer_line(offer: &Offer) -> String {
    let underline = offer
        .underline
        .as_deref()
        .map(|u| format!(" - {}", u))
        .unwrap_or_default();
    let savings = offer
        .savings_percent
        .filter(|s| *s > 0.0)
        .map(|s| format!(" (save {:.0}%)", s))
        .unwrap_or_default();
    format!("- {}{}: {}{}", offer.name, underline, offer.price, savings)
}

/// Group offers by department, best savings first, capped per department
fn group_offers(offers: &[Offer], cap: usize) -> Vec<DepartmentView> {
    let mut by_department: BTreeMap<&str, Vec<&Offer>> = BTreeMap::new();
    for offer in offers {
        by_department.entry(offer.department.as_str()).or_default().push(offer);
    }

    by_department
        .into_iter()
        .map(|(name, mut items)| {
            items.sort_by(|a, b| {
                let sa = a.savings_percent.unwrap_or(0.0);
                let sb = b.savings_percent.unwrap_or(0.0);
                sb.total_cmp(&sa)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.as_str().cmp(b.id.as_str()))
            });
            let total = items.len();
            DepartmentView {
                name: name.to_string(),
                total,
                lines: items.iter().take(cap).map(|o| offer_line(o)).collect(),
                hidden: total.saturating_sub(cap),
            }
        })
        .collect()
}
