//! Interactive loop: reads lines from stdin, dispatches slash commands, and
//! runs natural-language queries through the agent pipeline.
//!
//! The loop owns exactly one current session at a time and every user or
//! assistant turn is persisted before the next prompt is shown. Errors from a
//! single cycle are printed and swallowed; only `/exit`, end of input, or
//! ctrl-c end the loop.

use crate::agent::command::{parse_slash_command, SlashCommand};
use crate::agent::{AnalysisAgent, QueryAgent, QueryResult, Route, RoutingDecision, Supervisor};
use crate::session::{MessageRole, Session, SessionManager, DEFAULT_USER_ID};
use console::style;
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SESSION_TITLE: &str = "Default Session";
const PREVIEW_ROWS: usize = 10;

/// A routing decision waiting on the user's next line.
struct PendingDecision {
    decision: RoutingDecision,
}

pub struct InteractiveCli {
    manager: SessionManager,
    supervisor: Supervisor,
    query_agent: QueryAgent,
    analysis_agent: AnalysisAgent,
    current: Session,
    running: bool,
    pending: Option<PendingDecision>,
}

impl InteractiveCli {
    /// Builds the loop and resolves the starting session: the user's most
    /// recently active session, or a fresh default one.
    pub fn new(
        manager: SessionManager,
        supervisor: Supervisor,
        query_agent: QueryAgent,
        analysis_agent: AnalysisAgent,
    ) -> anyhow::Result<Self> {
        let existing = manager.get_all_sessions(DEFAULT_USER_ID)?;
        let current = match existing.into_iter().next() {
            Some(session) => {
                println!(
                    "{} {}",
                    style("Loaded recent session:").dim(),
                    session.title
                );
                session
            }
            None => {
                let session = manager.create_session(DEFAULT_SESSION_TITLE, DEFAULT_USER_ID)?;
                println!("{}", style("Created new default session").dim());
                session
            }
        };

        let cli = Self {
            manager,
            supervisor,
            query_agent,
            analysis_agent,
            current,
            running: true,
            pending: None,
        };
        cli.show_session_info();
        Ok(cli)
    }

    /// Main loop. Returns when the user exits or stdin closes.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while self.running {
            self.show_prompt();
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!("\n{}", style("Session saved. Goodbye!").yellow());
                break;
            };

            if let Err(err) = self.handle_line(&line).await {
                tracing::error!(error = %err, "input cycle failed");
                println!("{} {err:#}", style("Error:").red());
            }
        }
        Ok(())
    }

    fn show_prompt(&self) {
        print!("[{}] > ", self.current.title);
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    /// Processes one input line. Public so the dispatch and guard logic can
    /// be exercised without a terminal.
    pub async fn handle_line(&mut self, line: &str) -> anyhow::Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        if let Some(pending) = self.pending.take() {
            return self.resolve_pending(pending, line).await;
        }

        match parse_slash_command(line) {
            Some(command) => self.handle_slash_command(command),
            None => self.handle_query(line).await,
        }
    }

    fn handle_slash_command(&mut self, command: SlashCommand) -> anyhow::Result<()> {
        match command {
            SlashCommand::Help => {
                self.show_help();
                Ok(())
            }
            SlashCommand::Sessions => self.list_sessions(),
            SlashCommand::New { title } => self.create_new_session(&title),
            SlashCommand::Switch { arg } => self.switch_session(&arg),
            SlashCommand::Delete { arg } => self.delete_session(&arg),
            SlashCommand::Clear => self.clear_history(),
            SlashCommand::Exit => {
                self.running = false;
                println!("{}", style("Session saved. Goodbye!").yellow());
                Ok(())
            }
            SlashCommand::Unknown { name } => {
                println!(
                    "{} /{name}\nType {} for available commands.",
                    style("Unknown command:").red(),
                    style("/help").bold()
                );
                Ok(())
            }
        }
    }

    /// One natural-language query. The user's turn is persisted before any
    /// external call so a crash mid-pipeline never loses it.
    async fn handle_query(&mut self, query: &str) -> anyhow::Result<()> {
        self.manager
            .add_message_to_session(&mut self.current, MessageRole::User, query, None)?;

        println!("{} {query}", style("Processing query:").blue());
        let decision = self.supervisor.route(query).await;

        if decision.confirmation_needed {
            let message = decision
                .confirmation_message
                .clone()
                .unwrap_or_else(|| "Continue?".to_string());
            println!("{message}");
            self.manager.add_message_to_session(
                &mut self.current,
                MessageRole::Assistant,
                &message,
                None,
            )?;
            self.pending = Some(PendingDecision { decision });
            return Ok(());
        }

        self.execute_route(decision.route, &decision).await
    }

    /// Applies the user's answer to an outstanding confirmation or
    /// clarification. Anything that is not an answer cancels the pending
    /// workflow and is processed as a fresh line.
    async fn resolve_pending(
        &mut self,
        pending: PendingDecision,
        line: &str,
    ) -> anyhow::Result<()> {
        self.manager
            .add_message_to_session(&mut self.current, MessageRole::User, line, None)?;

        let decision = pending.decision;
        let chosen = match decision.route {
            Route::UserClarification => match line.trim() {
                "1" => Some(Route::QueryOnly),
                "2" => Some(Route::QueryThenAnalysis),
                "3" => Some(Route::QueryThenViz),
                _ => None,
            },
            route => {
                let answer = line.trim().to_lowercase();
                (answer == "yes" || answer == "y").then_some(route)
            }
        };

        match chosen {
            Some(route) => self.execute_route(route, &decision).await,
            None => {
                println!("{}", style("Okay, cancelled.").yellow());
                // Not an answer: treat the line as new input. A slash command
                // or a new question both work here.
                match parse_slash_command(line) {
                    Some(command) => self.handle_slash_command(command),
                    None => self.handle_query_routed(line).await,
                }
            }
        }
    }

    /// Query path for a line whose user turn is already persisted.
    async fn handle_query_routed(&mut self, query: &str) -> anyhow::Result<()> {
        println!("{} {query}", style("Processing query:").blue());
        let decision = self.supervisor.route(query).await;

        if decision.confirmation_needed {
            let message = decision
                .confirmation_message
                .clone()
                .unwrap_or_else(|| "Continue?".to_string());
            println!("{message}");
            self.manager.add_message_to_session(
                &mut self.current,
                MessageRole::Assistant,
                &message,
                None,
            )?;
            self.pending = Some(PendingDecision { decision });
            return Ok(());
        }

        self.execute_route(decision.route, &decision).await
    }

    /// Runs the query pipeline for a settled route and persists the
    /// assistant's turn with routing metadata.
    async fn execute_route(
        &mut self,
        route: Route,
        decision: &RoutingDecision,
    ) -> anyhow::Result<()> {
        let query = &decision.user_query;
        let result = self.query_agent.run(query).await?;

        let response = match route {
            Route::QueryOnly | Route::UserClarification => render_rows(&result),
            Route::QueryThenAnalysis => self.analysis_agent.insights(&result, query).await?,
            Route::QueryThenViz => {
                self.analysis_agent
                    .chart_recommendation(&result, query)
                    .await?
            }
        };

        println!("{} {response}", style("Response:").green());

        let mut metadata = HashMap::new();
        metadata.insert(
            "classification".to_string(),
            serde_json::json!(decision.classification.as_str()),
        );
        metadata.insert("route".to_string(), serde_json::json!(route.as_str()));
        metadata.insert("row_count".to_string(), serde_json::json!(result.row_count));
        self.manager.add_message_to_session(
            &mut self.current,
            MessageRole::Assistant,
            &response,
            Some(metadata),
        )?;
        Ok(())
    }

    fn show_help(&self) {
        println!(
            "\n{}\n\n{}\n  {:<28} - List all sessions\n  {:<28} - Create new named session\n  \
             {:<28} - Switch to existing session\n  {:<28} - Delete session by ID\n  \
             {:<28} - Clear current session history\n\n{}\n  {:<28} - Show this help\n  \
             {:<28} - Exit CLI\n\n{}\nJust type your question naturally (no slash prefix):\n  \
             {}\n  {}\n  {}\n\n{}\n- Queries automatically limited to recent data\n\
             - Read-only access to the warehouse\n- Sessions persisted across CLI restarts\n",
            style("BI Chat CLI Commands (Multi-Session Mode)").cyan().bold(),
            style("Session Management:").yellow(),
            style("/sessions").green(),
            style("/new \"Session Name\"").green(),
            style("/switch session-id").green(),
            style("/delete session-id").green(),
            style("/clear").green(),
            style("System:").yellow(),
            style("/help").green(),
            style("/exit").green(),
            style("Natural Language Queries:").yellow(),
            style("show me revenue trends for last week").dim(),
            style("what are the top user transactions").dim(),
            style("analyze user behavior patterns").dim(),
            style("Safety Features:").yellow(),
        );
    }

    fn list_sessions(&self) -> anyhow::Result<()> {
        let sessions = self.manager.get_all_sessions(DEFAULT_USER_ID)?;
        if sessions.is_empty() {
            println!(
                "{}",
                style("No sessions found. Use /new \"Session Name\" to create one.").yellow()
            );
            return Ok(());
        }

        println!(
            "{:>4}  {:<30} {:<17} {:>8}  {}",
            "ID", "Title", "Created", "Messages", "Active"
        );
        for session in sessions {
            let marker = if session.id == self.current.id { "*" } else { "" };
            println!(
                "{:>4}  {:<30} {:<17} {:>8}  {}",
                session.id.unwrap_or_default(),
                session.title,
                session.created_at.format("%Y-%m-%d %H:%M"),
                session.message_count(),
                marker
            );
        }
        Ok(())
    }

    fn create_new_session(&mut self, title: &str) -> anyhow::Result<()> {
        if title.is_empty() {
            println!(
                "{} /new \"Session Name\"",
                style("Please provide a session name:").red()
            );
            return Ok(());
        }

        let session = self.manager.create_session(title, DEFAULT_USER_ID)?;
        self.current = session;
        println!(
            "{} {}",
            style("Created and switched to new session:").green(),
            style(title).bold()
        );
        self.show_session_info();
        Ok(())
    }

    fn switch_session(&mut self, arg: &str) -> anyhow::Result<()> {
        if arg.is_empty() {
            println!("{}", style("Usage: /switch session-id").yellow());
            return self.list_sessions();
        }

        let Ok(session_id) = arg.parse::<i64>() else {
            println!("{} {arg}", style("Invalid session ID:").red());
            println!(
                "{}",
                style("Session ID must be a number. Use /sessions to see available IDs.").yellow()
            );
            return Ok(());
        };

        let Some(session) = self.manager.get_session_by_id(session_id)? else {
            println!("{} {session_id}", style("Session not found:").red());
            return Ok(());
        };

        if session.id == self.current.id {
            println!("{}", style("Already in that session").yellow());
            return Ok(());
        }

        println!(
            "{} {}",
            style("Switched to session:").green(),
            style(&session.title).bold()
        );
        self.current = session;
        self.show_session_info();
        Ok(())
    }

    fn delete_session(&mut self, arg: &str) -> anyhow::Result<()> {
        if arg.is_empty() {
            println!(
                "{} /delete session-id",
                style("Please provide session ID:").red()
            );
            return Ok(());
        }

        let Ok(session_id) = arg.parse::<i64>() else {
            println!("{} {arg}", style("Invalid session ID:").red());
            return Ok(());
        };

        if Some(session_id) == self.current.id {
            println!(
                "{}",
                style("Cannot delete the current active session. Switch to another session first.")
                    .red()
            );
            return Ok(());
        }

        let Some(session) = self.manager.get_session_by_id(session_id)? else {
            println!("{} {session_id}", style("Session not found:").red());
            return Ok(());
        };

        if self.manager.delete_session(session_id)? {
            println!("{} {}", style("Deleted session:").green(), session.title);
        } else {
            println!("{}", style("Failed to delete session").red());
        }
        Ok(())
    }

    fn clear_history(&mut self) -> anyhow::Result<()> {
        self.current.clear_history();
        self.manager.update_session_activity(&mut self.current)?;
        println!("{}", style("Session history cleared").green());
        Ok(())
    }

    fn show_session_info(&self) {
        println!(
            "{}\n  {}\n  ID: {}\n  Created: {}\n  Messages: {}",
            style("Current Session").green(),
            style(&self.current.title).bold(),
            self.current.id.unwrap_or_default(),
            self.current.created_at.format("%Y-%m-%d %H:%M"),
            self.current.message_count()
        );
    }

    #[cfg(test)]
    fn current_session(&self) -> &Session {
        &self.current
    }
}

/// Plain-text rendering of a raw-data result: row count, timing, and the
/// first rows pretty-printed.
fn render_rows(result: &QueryResult) -> String {
    if result.data.is_empty() {
        return "No data found for your query. Try adjusting your date range or criteria."
            .to_string();
    }

    let preview: Vec<_> = result.data.iter().take(PREVIEW_ROWS).collect();
    let body = serde_json::to_string_pretty(&preview).unwrap_or_else(|_| "[]".to_string());
    let mut text = format!(
        "{} rows in {:.2}s:\n{body}",
        result.row_count, result.execution_time
    );
    if result.row_count > PREVIEW_ROWS {
        text.push_str(&format!(
            "\n... and {} more rows",
            result.row_count - PREVIEW_ROWS
        ));
    }
    text
}
