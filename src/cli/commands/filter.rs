//! Filter command implementation.

use anyhow::Result;
use board_core::unique_assignees;

use crate::cli::{FilterArgs, SeverityChoice, Session};
use crate::format::format_filters;

/// Execute the filter command.
///
/// `--reset` is applied before any other flag; with no flags the current
/// filters are printed unchanged.
///
/// # Errors
///
/// Returns an error if listing assignees requires a fetch that fails, or if
/// JSON serialization fails.
pub async fn execute(args: &FilterArgs, session: &Session) -> Result<()> {
    let store = &session.store;

    if args.reset {
        store.reset_filters();
    }
    if let Some(assignee) = &args.assignee {
        let assignee = assignee.trim();
        if assignee.eq_ignore_ascii_case("all") {
            store.set_assignee_filter("");
        } else {
            store.set_assignee_filter(assignee);
        }
    }
    if let Some(SeverityChoice(severity)) = args.severity {
        store.set_severity_filter(severity);
    }

    let assignees = if args.assignees {
        session.fetch().await?;
        Some(unique_assignees(&store.issues()))
    } else {
        None
    };

    let filters = store.filters();
    if session.out.json {
        let mut output = serde_json::to_value(&filters)?;
        if let Some(names) = &assignees {
            output["assignees"] = serde_json::json!(names);
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}",
        format_filters(&filters).unwrap_or_else(|| "Filters: none".to_string())
    );
    if let Some(names) = assignees {
        println!("Assignees: {}", names.join(", "));
    }
    Ok(())
}
