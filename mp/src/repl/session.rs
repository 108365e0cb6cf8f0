//! Interactive planning chat

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::domain::{ChatRole, HouseholdId, OfferFilter, OfferId, SessionId, SessionState};
use crate::planner::{Planner, PlannerError};

/// Outcome of a slash command
enum SlashResult {
    Continue,
    Quit,
}

/// One household's chat with the planner
pub struct ChatRepl {
    planner: Arc<Planner>,
    household: HouseholdId,
    session: SessionId,
}

impl ChatRepl {
    /// Start a fresh planning session for a household
    pub async fn start(planner: Arc<Planner>, household: HouseholdId) -> Result<Self> {
        debug!(%household, "ChatRepl::start: called");
        let session = planner.start_session(household.clone()).await?;
        Ok(Self {
            planner,
            household,
            session,
        })
    }

    /// Run the chat loop until /quit or Ctrl+D
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await? {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_message(input).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Meal Planner".bright_cyan().bold());
        println!("Planning for household: {}", self.household.as_str().cyan());
        println!("Say hello to start a plan. Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn process_message(&mut self, input: &str) -> Result<()> {
        let state = self.planner.session(&self.session).await?.state;
        if matches!(state, SessionState::AskSpecialRequests | SessionState::ReviewPlan) {
            println!("{}", "Thinking...".dimmed());
        }

        match self.planner.handle_message(&self.session, input).await {
            Ok(reply) => {
                println!();
                println!("{}", reply.text);
                println!();
                match reply.state {
                    SessionState::ReviewPlan => {
                        println!("{}", "Reply 'accept' to save this plan, or tell me what to change.".dimmed());
                    }
                    SessionState::Accepted => {
                        println!("{}", "Type /list to see your shopping list or /new to plan again.".dimmed());
                    }
                    _ => {}
                }
            }
            Err(e) => self.print_error(&e),
        }
        Ok(())
    }

    fn print_error(&self, err: &PlannerError) {
        warn!(session_id = %self.session, error = %err, "Message failed");
        let prefix = if err.is_recoverable() { "!".yellow() } else { "✗".red() };
        println!("{} {}", prefix, err.user_message());
    }

    async fn handle_slash_command(&mut self, input: &str) -> Result<SlashResult> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        let args = parts.get(1..).unwrap_or_default();

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return Ok(SlashResult::Quit),
            "/new" => {
                if let Err(e) = self.planner.reset(&self.session).await {
                    debug!(error = %e, "handle_slash_command: reset of old session failed");
                }
                self.session = self.planner.start_session(self.household.clone()).await?;
                println!("{}", "Started a new plan. Say hello to begin.".dimmed());
            }
            "/offers" => self.print_offers(args).await?,
            "/select" => {
                let ids: Vec<OfferId> = args.iter().map(|a| OfferId::new(*a)).collect();
                match self.planner.select_offers(&self.session, ids).await {
                    Ok(offers) if offers.is_empty() => println!("{}", "No offers selected.".dimmed()),
                    Ok(offers) => {
                        println!("{} Must include:", "✓".green());
                        for offer in offers {
                            println!("  - {} ({})", offer.name, offer.price);
                        }
                    }
                    Err(e) => self.print_error(&e),
                }
            }
            "/plan" => match self.planner.session(&self.session).await?.current_plan_text {
                Some(plan) => println!("\n{}\n", plan),
                None => println!("{}", "No plan yet.".dimmed()),
            },
            "/list" => self.print_shopping_list().await?,
            "/history" => self.print_history().await?,
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        Ok(SlashResult::Continue)
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:18} Show this help", "/help".yellow());
        println!("  {:18} Exit", "/quit".yellow());
        println!("  {:18} Throw away this plan and start over", "/new".yellow());
        println!("  {:18} List this week's offers", "/offers [search]".yellow());
        println!("  {:18} Require offers in the plan", "/select <id>...".yellow());
        println!("  {:18} Show the current plan", "/plan".yellow());
        println!("  {:18} Show the shopping list", "/list".yellow());
        println!("  {:18} Show this conversation", "/history".yellow());
        println!();
    }

    async fn print_offers(&self, args: &[&str]) -> Result<()> {
        let filter = OfferFilter {
            query: (!args.is_empty()).then(|| args.join(" ")),
            ..OfferFilter::default()
        };
        let offers = self.planner.collaborators().offers.available(&filter).await?;
        if offers.is_empty() {
            println!("{}", "No offers found.".dimmed());
            return Ok(());
        }

        let mut department = "";
        for offer in &offers {
            if offer.department != department {
                department = &offer.department;
                println!("{}", department.bright_cyan());
            }
            let savings = offer
                .savings_percent
                .map(|s| format!(" (-{:.0}%)", s))
                .unwrap_or_default();
            println!("  {:12} {} {}{}", offer.id.as_str().yellow(), offer.name, offer.price, savings.green());
        }
        Ok(())
    }

    async fn print_shopping_list(&self) -> Result<()> {
        let sink = &self.planner.collaborators().shopping_list;
        let list = sink.active_list(&self.household).await?;
        let mut items = sink.items(&list).await?;
        items.sort_by(|a, b| a.entry.category.cmp(&b.entry.category));
        if items.is_empty() {
            println!("{}", "Shopping list is empty.".dimmed());
            return Ok(());
        }

        let mut category = String::new();
        for item in &items {
            let item_category = item.entry.category.clone().unwrap_or_default();
            if item_category != category {
                category = item_category;
                println!("{}", category.bright_cyan());
            }
            let mark = if item.checked { "[x]" } else { "[ ]" };
            println!("  {} {}", mark, item.entry);
        }
        Ok(())
    }

    async fn print_history(&self) -> Result<()> {
        let session = self.planner.session(&self.session).await?;
        if session.messages.is_empty() {
            println!("{}", "No conversation yet.".dimmed());
            return Ok(());
        }

        println!();
        println!("{}", "Conversation:".bright_cyan());
        for (i, msg) in session.messages.iter().enumerate() {
            let role = match msg.role {
                ChatRole::User => "You".bright_green(),
                ChatRole::Assistant => "Planner".bright_blue(),
                ChatRole::System => "System".dimmed(),
            };
            let preview: String = msg.text.chars().take(60).collect();
            let ellipsis = if msg.text.chars().count() > 60 { "..." } else { "" };
            println!("  {}. {}: {}{}", i + 1, role, preview.replace('\n', " "), ellipsis);
        }
        println!();
        Ok(())
    }
}
