//! mp - conversational meal planner
//!
//! CLI entry point for the planning chat and its offline helpers.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use eyre::{Context, Result};
use tracing::{debug, info};

use mealplanner::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use mealplanner::config::Config;
use mealplanner::domain::{AdHocParams, HistoryEntryId, HouseholdId, HouseholdPreferences, OfferFilter};
use mealplanner::llm::create_client;
use mealplanner::parser::{PlanParser, extract_meals};
use mealplanner::planner::{Collaborators, Planner};
use mealplanner::prompts::{PromptAssembler, PromptInputs};
use mealplanner::repl::ChatRepl;
use mealplanner::store::{
    HistoryStore, JsonlHistoryStore, MemoryOffersStore, MemorySessionStore, MemoryShoppingList, PreferencesStore,
    YamlPreferencesStore,
};

fn setup_logging(level_str: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let level = match level_str.map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let api_key_env = mealplanner::config::LlmConfig::default().api_key_env;
    let cmd = Cli::command().after_help(generate_after_help(&api_key_env));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    setup_logging(cli.effective_log_level().as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, data_dir = %config.storage.data_dir.display(), "mp loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Chat { household }) => cmd_chat(&config, &household).await,
        None => cmd_chat(&config, mealplanner::cli::DEFAULT_HOUSEHOLD).await,
        Some(Command::Parse { file, format }) => cmd_parse(&config, &file, format).await,
        Some(Command::Prompt {
            household,
            meals,
            request,
        }) => cmd_prompt(&config, &household, meals, request).await,
        Some(Command::Prefs { household, reset }) => cmd_prefs(&config, &household, reset).await,
        Some(Command::History { household, weeks }) => cmd_history(&config, &household, weeks).await,
        Some(Command::Rate {
            id,
            rating,
            comment,
            no_repeat,
        }) => cmd_rate(&config, &id, rating, comment, !no_repeat).await,
    }
}

/// Collaborators for the CLI: file-backed preferences, history and offers; in-memory sessions
async fn build_collaborators(config: &Config) -> Result<Collaborators> {
    debug!(data_dir = %config.storage.data_dir.display(), "build_collaborators: called");
    let offers = match &config.storage.offers_file {
        Some(path) => MemoryOffersStore::from_json_file(path)
            .await
            .context(format!("Failed to load offers from {}", path.display()))?,
        None => MemoryOffersStore::new(Vec::new()),
    };

    Ok(Collaborators {
        sessions: Arc::new(MemorySessionStore::new()),
        preferences: Arc::new(YamlPreferencesStore::new(config.storage.preferences_dir())),
        history: Arc::new(JsonlHistoryStore::new(config.storage.history_file())),
        offers: Arc::new(offers),
        shopping_list: Arc::new(MemoryShoppingList::new()),
    })
}

/// Interactive planning chat
async fn cmd_chat(config: &Config, household: &str) -> Result<()> {
    debug!(%household, "cmd_chat: called");
    config.validate()?;

    let client = create_client(&config.llm).context("Failed to create LLM client")?;
    let collaborators = build_collaborators(config).await?;
    let planner = Arc::new(Planner::from_config(config, client, collaborators)?);

    let mut repl = ChatRepl::start(planner, HouseholdId::new(household)).await?;
    repl.run().await
}

/// Print the shopping list and meals found in a plan file
async fn cmd_parse(config: &Config, file: &Path, format: OutputFormat) -> Result<()> {
    debug!(file = %file.display(), ?format, "cmd_parse: called");
    let text = tokio::fs::read_to_string(file)
        .await
        .context(format!("Failed to read plan file {}", file.display()))?;

    let parser = PlanParser::from_config(&config.parser)?;
    let entries = parser.parse(&text);
    let meals = extract_meals(&text);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "meals": meals, "entries": entries });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if !meals.is_empty() {
                println!("Meals:");
                for meal in &meals {
                    println!("  Day {}: {}", meal.day, meal.name);
                }
                println!();
            }
            if entries.is_empty() {
                println!("No shopping-list items found.");
                return Ok(());
            }
            println!("Shopping list ({} items):", entries.len());
            let mut category: Option<&str> = None;
            for entry in &entries {
                let current = entry.category.as_deref();
                if current != category {
                    category = current;
                    println!("  [{}]", current.unwrap_or("Uncategorized"));
                }
                println!("  - {}", entry);
            }
        }
    }
    Ok(())
}

/// Print the prompt a new plan would be generated from
async fn cmd_prompt(config: &Config, household: &str, meals: Option<u32>, request: Option<String>) -> Result<()> {
    debug!(%household, ?meals, ?request, "cmd_prompt: called");
    let household = HouseholdId::new(household);
    let collaborators = build_collaborators(config).await?;
    let assembler = PromptAssembler::from_config(&config.prompts)?;

    let preferences = collaborators.preferences.load(&household).await?;
    let history = collaborators
        .history
        .recent(&household, config.planning.history_weeks)
        .await?;
    let available = collaborators.offers.available(&OfferFilter::default()).await?;
    let (min, max) = (config.planning.min_meals, config.planning.max_meals);
    let ad_hoc = AdHocParams {
        num_meals: meals.map(|n| n.clamp(min, max.max(min))),
        special_requests: request,
        selected_offers: Vec::new(),
    };

    let prompt = assembler.assemble(&PromptInputs {
        preferences: &preferences,
        history: &history,
        history_weeks: config.planning.history_weeks,
        ad_hoc: &ad_hoc,
        selected_offers: &[],
        available_offers: &available,
    })?;
    println!("{}", prompt);
    Ok(())
}

/// Show household preferences, optionally resetting them to defaults first
async fn cmd_prefs(config: &Config, household: &str, reset: bool) -> Result<()> {
    debug!(%household, reset, "cmd_prefs: called");
    let household = HouseholdId::new(household);
    let store = YamlPreferencesStore::new(config.storage.preferences_dir());

    if reset {
        store.save(&household, &HouseholdPreferences::default()).await?;
        println!("Preferences reset: {}", store.path_for(&household).display());
    }

    let preferences = store.load(&household).await?;
    println!("# {}", store.path_for(&household).display());
    print!("{}", serde_yaml::to_string(&preferences)?);
    Ok(())
}

/// List recently accepted plans
async fn cmd_history(config: &Config, household: &str, weeks: u32) -> Result<()> {
    debug!(%household, weeks, "cmd_history: called");
    let store = JsonlHistoryStore::new(config.storage.history_file());
    let entries = store.recent(&HouseholdId::new(household), weeks).await?;

    if entries.is_empty() {
        println!("No plans in the last {} weeks.", weeks);
        return Ok(());
    }
    for entry in entries {
        let rating = entry
            .rating
            .map(|r| format!("{}/5", r))
            .unwrap_or_else(|| "unrated".to_string());
        println!("{}  {}  [{}]  {}", entry.id, entry.planned_at.format("%Y-%m-%d"), rating, entry.label());
    }
    Ok(())
}

/// Attach a rating to an accepted plan
async fn cmd_rate(config: &Config, id: &str, rating: u8, comment: Option<String>, would_repeat: bool) -> Result<()> {
    debug!(%id, rating, would_repeat, "cmd_rate: called");
    let store = JsonlHistoryStore::new(config.storage.history_file());
    let entry = store
        .rate(&HistoryEntryId::new(id), rating, comment, would_repeat)
        .await
        .context(format!("Failed to rate plan {}", id))?;
    println!("Rated {} {}/5", entry.label(), rating);
    Ok(())
}
