//! Move command implementation.
//!
//! Applies the status change optimistically and waits for the service. A
//! rejected update has already been rolled back by the time it is reported.

use anyhow::{Context, Result};
use board_core::{BoardError, IssuePatch};
use chrono::Utc;

use crate::cli::{MoveArgs, Session};
use crate::format::ScoredIssue;

const REVERTED: &str = "Failed to update issue. Changes have been reverted.";

/// Execute the move command.
///
/// # Errors
///
/// Returns an error for read-only roles, unknown issues and rejected updates.
pub async fn execute(args: &MoveArgs, session: &Session) -> Result<()> {
    session.require_edit()?;
    session.fetch().await?;

    let pending = session
        .store
        .update_issue(&args.id, IssuePatch::status(args.status))?;

    let spinner = session
        .out
        .spinner(&format!("Moving #{} to {}...", args.id, args.status));
    let result = pending.wait().await;
    spinner.finish_and_clear();

    let issue = match result {
        Ok(issue) => issue,
        Err(e @ BoardError::UpdateRejected { .. }) => return Err(e).context(REVERTED),
        Err(e) => return Err(e.into()),
    };

    if session.out.json {
        let output = ScoredIssue::new(issue, Utc::now());
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Moved #{} to {}", issue.id, issue.status);
    }
    Ok(())
}
