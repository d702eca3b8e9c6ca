use anyhow::Result;
use chrono::Utc;

use crate::cli::Session;
use crate::format::{ScoredIssue, format_issue_line};

/// Execute the recent command: recently opened issues, most recent first.
///
/// # Errors
///
/// Returns an error if the fetch fails or JSON serialization fails.
pub async fn execute(session: &Session) -> Result<()> {
    session.fetch().await?;
    let issues = session.store.recent_issues();

    if session.out.json {
        let now = Utc::now();
        let output: Vec<ScoredIssue> = issues
            .into_iter()
            .map(|issue| ScoredIssue::new(issue, now))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if issues.is_empty() {
        println!("No recently accessed issues.");
        return Ok(());
    }
    println!("Recently Accessed");
    for issue in &issues {
        println!("  {} [{}]", format_issue_line(issue), issue.status);
    }
    Ok(())
}
