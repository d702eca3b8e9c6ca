//! List command implementation.
//!
//! Fetches the issue set and prints the filtered board as three
//! priority-sorted columns, or as a `BoardView` in JSON mode.

use anyhow::Result;
use board_core::BoardColumns;
use chrono::Utc;

use crate::cli::{ListArgs, Session};
use crate::format::{BoardView, format_filters, format_last_synced, render_board};

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the fetch fails or JSON serialization fails.
pub async fn execute(args: &ListArgs, session: &Session) -> Result<()> {
    session.fetch().await?;

    let now = Utc::now();
    let state = session.store.snapshot();
    let mut columns = session.store.board_view_at(now);
    if let Some(status) = args.status {
        columns = BoardColumns::from_issues(columns.column(status).to_vec());
    }

    if session.out.json {
        let view = BoardView::new(&columns, state.filters, state.last_sync_time, now);
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let role = session.config.user.role;
    if !role.can_edit() {
        println!("{}", role.description());
    }
    if let Some(summary) = format_filters(&state.filters) {
        println!("{summary}");
        println!();
    }
    if columns.is_empty() {
        println!("No issues match the current filters.");
    } else {
        print!(
            "{}",
            render_board(&columns, now, session.out.width, session.out.colors)
        );
    }
    println!();
    println!(
        "{} issue(s) · {}",
        columns.len(),
        format_last_synced(state.last_sync_time, now)
    );
    Ok(())
}
