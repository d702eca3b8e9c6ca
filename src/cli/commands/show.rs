//! Show command implementation.

use anyhow::{Result, bail};
use chrono::Utc;

use crate::cli::{Session, ShowArgs};
use crate::format::{ScoredIssue, format_issue_details};

/// Execute the show command.
///
/// # Errors
///
/// Returns an error if the fetch fails or the issue does not exist.
pub async fn execute(args: &ShowArgs, session: &Session) -> Result<()> {
    session.fetch().await?;

    let Some(issue) = session.store.issue(&args.id) else {
        bail!("Issue not found: {}", args.id);
    };
    session.store.add_recently_accessed(&issue.id);

    let now = Utc::now();
    if session.out.json {
        let output = ScoredIssue::new(issue, now);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_issue_details(&issue, now, session.out.colors));
    }
    Ok(())
}
