//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::MAX_HISTORY_WEEKS;

/// Household used when none is given
pub const DEFAULT_HOUSEHOLD: &str = "home";

/// mp - conversational weekly meal planner
#[derive(Parser)]
#[command(
    name = "mp",
    about = "Plan a week of dinners from your preferences and this week's offers",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Effective log level: explicit level first, then -v
    pub fn effective_log_level(&self) -> Option<String> {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => Some(level.clone()),
            (None, true) => Some("DEBUG".to_string()),
            (None, false) => None,
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan meals interactively (default)
    Chat {
        /// Household to plan for
        #[arg(long, default_value = DEFAULT_HOUSEHOLD)]
        household: String,
    },

    /// Extract the shopping list from a plan file
    Parse {
        /// Markdown plan file
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the prompt that would be sent for a new plan
    Prompt {
        /// Household to plan for
        #[arg(long, default_value = DEFAULT_HOUSEHOLD)]
        household: String,

        /// Number of dinners
        #[arg(short, long)]
        meals: Option<u32>,

        /// Special requests for this week
        #[arg(short, long)]
        request: Option<String>,
    },

    /// Show or initialise household preferences
    Prefs {
        /// Household to show
        #[arg(long, default_value = DEFAULT_HOUSEHOLD)]
        household: String,

        /// Overwrite the stored preferences with defaults
        #[arg(long)]
        reset: bool,
    },

    /// List recently accepted plans
    History {
        /// Household to show
        #[arg(long, default_value = DEFAULT_HOUSEHOLD)]
        household: String,

        /// How many weeks back to look
        #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..=MAX_HISTORY_WEEKS as i64))]
        weeks: u32,
    },

    /// Rate an accepted plan after cooking it
    Rate {
        /// History entry id (from `mp history`)
        id: String,

        /// Stars from 1 to 5
        rating: u8,

        /// Optional note for future plans
        #[arg(long)]
        comment: Option<String>,

        /// Don't suggest these meals again
        #[arg(long)]
        no_repeat: bool,
    },
}

/// Get the path to the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mealplanner")
        .join("logs")
        .join("mealplanner.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with API key status and log location
pub fn generate_after_help(api_key_env: &str) -> String {
    debug!(%api_key_env, "generate_after_help: called");
    let mut help = String::new();

    let key_status = if std::env::var(api_key_env).is_ok() { "set" } else { "missing" };
    help.push_str(&format!("API key ({}): {}\n", api_key_env, key_status));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// Output format for the parse command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use text or json", s)),
        }
    }
}
