//! Output formatting for `board`.
//!
//! Supports both human-readable text output and machine-parseable JSON.
//!
//! # JSON Output Types
//!
//! - [`BoardView`] - Filtered board split into columns (list)
//! - [`ScoredIssue`] - Issue with its current priority score (show/recent)

mod output;
mod text;

pub use output::{BoardView, ColumnView, ScoredIssue};
pub use text::{
    format_column_header, format_filters, format_issue_details, format_issue_line, format_last_synced, format_notice,
    format_scored_line, format_severity_badge, pad_to_width, render_board, severity_color,
    severity_label, status_color, truncate_to_width,
};
