//! Watch command implementation.
//!
//! Keeps the board on screen while polling runs in the background. Every
//! state change or notice re-renders the frame. Line commands on stdin
//! drive the store; end of input or Ctrl-C ends the session.

use std::io::{self, BufRead, IsTerminal, Write};
use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::Result;
use board_core::{BoardColumns, BoardError, IssuePatch, Notice, SearchDebouncer, Status};
use chrono::Utc;
use crossterm::{cursor, execute, terminal};
use tokio::sync::{broadcast, mpsc};

use crate::cli::{Session, parse_severity_choice, parse_status};
use crate::format::{
    format_filters, format_issue_details, format_last_synced, format_notice, render_board,
};

const HELP: &str = "\
Commands:
  move ID STATUS      move an issue (backlog, in-progress, done)
  undo                revert the last move while the window is open
  search [TEXT]       set the search query (no text clears it)
  assignee NAME|all   filter by assignee
  severity N|all      filter by severity
  reset               clear all filters
  interval SECS       change the polling interval (5-60)
  show ID             show issue details
  refresh             fetch now
  dismiss             clear the error line and last notice
  help                show this help
  quit                leave";

/// A parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Move { id: String, status: Status },
    Undo,
    Search(String),
    Assignee(Option<String>),
    Severity(Option<i32>),
    Reset,
    Interval(u64),
    Show(String),
    Refresh,
    Dismiss,
    Help,
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
///
/// # Errors
///
/// Returns a usage message for unknown commands or missing arguments.
pub fn parse_watch_command(line: &str) -> std::result::Result<Option<WatchCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    let command = match verb.to_lowercase().as_str() {
        "move" | "mv" => {
            let (id, status) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: move ID STATUS")?;
            WatchCommand::Move {
                id: id.to_string(),
                status: parse_status(status)?,
            }
        }
        "undo" | "u" => WatchCommand::Undo,
        "search" => WatchCommand::Search(rest.to_string()),
        "assignee" => {
            if rest.is_empty() {
                return Err("usage: assignee NAME|all".into());
            }
            if rest.eq_ignore_ascii_case("all") {
                WatchCommand::Assignee(None)
            } else {
                WatchCommand::Assignee(Some(rest.to_string()))
            }
        }
        "severity" => {
            if rest.is_empty() {
                return Err("usage: severity N|all".into());
            }
            WatchCommand::Severity(parse_severity_choice(rest)?.0)
        }
        "reset" => WatchCommand::Reset,
        "interval" => WatchCommand::Interval(
            rest.parse()
                .map_err(|_| "usage: interval SECS".to_string())?,
        ),
        "show" => {
            if rest.is_empty() {
                return Err("usage: show ID".into());
            }
            WatchCommand::Show(rest.to_string())
        }
        "refresh" | "r" => WatchCommand::Refresh,
        "dismiss" | "clear" => WatchCommand::Dismiss,
        "help" | "?" => WatchCommand::Help,
        "quit" | "exit" | "q" => WatchCommand::Quit,
        other => return Err(format!("unknown command '{other}' (type `help`)")),
    };
    Ok(Some(command))
}

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the terminal cannot be written or Ctrl-C handling
/// cannot be installed.
pub async fn execute(session: Session) -> Result<()> {
    let mut watch = Watch::new(session);
    watch.run().await
}

/// Read stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

struct Watch {
    session: Session,
    debouncer: SearchDebouncer,
    last_notice: Option<Notice>,
    message: Option<String>,
    clear_screen: bool,
}

impl Watch {
    fn new(session: Session) -> Self {
        let debouncer =
            SearchDebouncer::with_delay(session.store.clone(), session.config.search_debounce());
        let clear_screen = !session.out.json && io::stdout().is_terminal();
        Self {
            session,
            debouncer,
            last_notice: None,
            message: None,
            clear_screen,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let store = self.session.store.clone();
        let mut state_rx = store.subscribe();
        let mut notices = store.subscribe_notices();
        let mut lines = spawn_stdin_reader();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        store.start_polling();
        self.render()?;

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.render()?;
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => {
                        self.last_notice = Some(notice);
                        self.render()?;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Notice receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                line = lines.recv() => {
                    let Some(line) = line else {
                        tracing::debug!("Input closed");
                        break;
                    };
                    if self.handle_line(&line?).is_break() {
                        break;
                    }
                    self.render()?;
                }
                result = &mut ctrl_c => {
                    result?;
                    break;
                }
            }
        }

        store.stop_polling();
        self.debouncer.cancel();
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        self.message = None;
        match parse_watch_command(line) {
            Ok(Some(command)) => self.apply(command),
            Ok(None) => ControlFlow::Continue(()),
            Err(usage) => {
                self.message = Some(usage);
                ControlFlow::Continue(())
            }
        }
    }

    fn apply(&mut self, command: WatchCommand) -> ControlFlow<()> {
        let store = self.session.store.clone();
        match command {
            WatchCommand::Move { id, status } => {
                if let Err(e) = self.session.require_edit() {
                    self.message = Some(e.to_string());
                } else {
                    // The outcome arrives as a notice if the service rejects it.
                    match store.update_issue(&id, IssuePatch::status(status)) {
                        Ok(pending) => drop(pending),
                        Err(e) => self.report(&e),
                    }
                }
            }
            WatchCommand::Undo => {
                if let Err(e) = self.session.require_edit() {
                    self.message = Some(e.to_string());
                } else if let Err(e) = store.undo() {
                    self.report(&e);
                }
            }
            WatchCommand::Search(text) => self.debouncer.input(text),
            WatchCommand::Assignee(name) => store.set_assignee_filter(name.unwrap_or_default()),
            WatchCommand::Severity(level) => store.set_severity_filter(level),
            WatchCommand::Reset => {
                self.debouncer.cancel();
                store.reset_filters();
            }
            WatchCommand::Interval(secs) => {
                match store.set_polling_interval(Duration::from_secs(secs)) {
                    Ok(()) => self.message = Some(format!("Polling every {secs}s")),
                    Err(e) => self.message = Some(e.to_string()),
                }
            }
            WatchCommand::Show(id) => match store.issue(&id) {
                Some(issue) => {
                    store.add_recently_accessed(&issue.id);
                    self.message = Some(format_issue_details(
                        &issue,
                        Utc::now(),
                        self.session.out.colors,
                    ));
                }
                None => self.message = Some(format!("Issue not found: {id}")),
            },
            WatchCommand::Refresh => {
                tokio::spawn(async move {
                    if let Err(e) = store.fetch_all().await {
                        tracing::debug!("Refresh failed: {e}");
                    }
                });
            }
            WatchCommand::Dismiss => {
                self.last_notice = None;
                store.clear_error();
            }
            WatchCommand::Help => self.message = Some(HELP.to_string()),
            WatchCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Errors the store already announced as notices are only logged.
    fn report(&mut self, err: &BoardError) {
        match err {
            BoardError::IssueNotFound { .. } | BoardError::NothingToUndo => {
                tracing::debug!("{err}");
            }
            other => self.message = Some(other.to_string()),
        }
    }

    fn render(&self) -> Result<()> {
        let mut stdout = io::stdout().lock();
        if self.clear_screen {
            execute!(
                stdout,
                terminal::Clear(terminal::ClearType::All),
                cursor::MoveTo(0, 0)
            )?;
        }
        stdout.write_all(self.frame().as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn frame(&self) -> String {
        let now = Utc::now();
        let out = &self.session.out;
        let user = &self.session.config.user;
        let state = self.session.store.snapshot();

        let mut frame = format!(
            "Issue Board · {} ({}) · polling every {}s\n",
            user.name,
            user.role.as_str(),
            state.polling_interval.as_secs()
        );
        if !user.role.can_edit() {
            frame.push_str(user.role.description());
            frame.push('\n');
        }
        if let Some(summary) = format_filters(&state.filters) {
            frame.push_str(&summary);
            frame.push('\n');
        }
        frame.push('\n');

        let columns = BoardColumns::from_issues(state.filters.apply(&state.issues, now));
        frame.push_str(&render_board(&columns, now, out.width, out.colors));
        frame.push('\n');

        frame.push_str(&format!(
            "{} issue(s) · {}",
            columns.len(),
            format_last_synced(state.last_sync_time, now)
        ));
        if state.loading {
            frame.push_str(" · Loading issues...");
        }
        frame.push('\n');
        if let Some(error) = &state.error {
            frame.push_str(&format!("Error: {error}\n"));
        }
        if let Some(undo) = &state.undo_state {
            frame.push_str(&format!(
                "Moved #{} · type `undo` to revert\n",
                undo.previous_issue.id
            ));
        }
        if let Some(notice) = &self.last_notice {
            frame.push_str(&format_notice(notice, out.colors));
            frame.push('\n');
        }
        if let Some(message) = &self.message {
            frame.push_str(message);
            frame.push('\n');
        }
        frame.push_str("> ");
        if !self.clear_screen {
            frame.push('\n');
        }
        frame
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.session.store.stop_polling();
    }
}
