//! Text formatting functions for `board`.
//!
//! Provides terminal formatting for board output:
//! - Column headers coloured per status
//! - Severity badges (`[S3]`) coloured by urgency
//! - Issue lines and three-column board layout
//! - "Last synced" status line
//!
//! Colours are optional; widths are measured with `unicode-width` on the
//! plain text before any styling is applied.

use board_core::scoring::compute_priority_score;
use board_core::{BoardColumns, FilterState, Issue, Notice, NoticeLevel, SeverityLevel, Status};
use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Gap between board columns.
const COLUMN_GAP: &str = "  ";

/// Narrowest column the side-by-side layout accepts.
const MIN_COLUMN_WIDTH: usize = 24;

#[must_use]
pub const fn severity_label(level: SeverityLevel) -> &'static str {
    match level {
        SeverityLevel::Critical => "critical",
        SeverityLevel::Medium => "medium",
        SeverityLevel::Low => "low",
    }
}

/// Red for critical, amber for medium, green for low.
#[must_use]
pub const fn severity_color(level: SeverityLevel) -> Color {
    match level {
        SeverityLevel::Critical => Color::Rgb {
            r: 0xef,
            g: 0x44,
            b: 0x44,
        },
        SeverityLevel::Medium => Color::Rgb {
            r: 0xf5,
            g: 0x9e,
            b: 0x0b,
        },
        SeverityLevel::Low => Color::Rgb {
            r: 0x10,
            g: 0xb9,
            b: 0x81,
        },
    }
}

#[must_use]
pub const fn status_color(status: Status) -> Color {
    match status {
        Status::Backlog => Color::Rgb {
            r: 0x6b,
            g: 0x72,
            b: 0x80,
        },
        Status::InProgress => Color::Rgb {
            r: 0x3b,
            g: 0x82,
            b: 0xf6,
        },
        Status::Done => Color::Rgb {
            r: 0x10,
            g: 0xb9,
            b: 0x81,
        },
    }
}

/// Format severity as "[S1]", "[S3]", etc.
#[must_use]
pub fn format_severity_badge(severity: i32) -> String {
    format!("[S{severity}]")
}

/// Format a single-line issue summary.
///
/// Format: `#{id} [S{severity}] {title} @{assignee}`
#[must_use]
pub fn format_issue_line(issue: &Issue) -> String {
    let mut line = format!(
        "#{} {} {}",
        issue.id,
        format_severity_badge(issue.severity),
        issue.title
    );
    if !issue.assignee.is_empty() {
        line.push_str(" @");
        line.push_str(&issue.assignee);
    }
    line
}

/// Issue line with the score appended, as shown in board columns.
#[must_use]
pub fn format_scored_line(issue: &Issue, now: DateTime<Utc>) -> String {
    format!(
        "{} ({})",
        format_issue_line(issue),
        compute_priority_score(issue, now)
    )
}

/// "Last synced just now", "Last synced 12s ago" or "Never synced".
#[must_use]
pub fn format_last_synced(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last_sync {
        None => "Never synced".to_string(),
        Some(at) => {
            let secs = (now - at).num_seconds().max(0);
            if secs == 0 {
                "Last synced just now".to_string()
            } else {
                format!("Last synced {secs}s ago")
            }
        }
    }
}

/// Cut `text` to at most `width` display columns, marking the cut with `…`.
#[must_use]
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Right-pad `text` with spaces to exactly `width` display columns.
#[must_use]
pub fn pad_to_width(text: &str, width: usize) -> String {
    let fitted = truncate_to_width(text, width);
    let padding = width.saturating_sub(fitted.width());
    format!("{fitted}{}", " ".repeat(padding))
}

fn paint(text: String, color: Color, colors: bool) -> String {
    if colors {
        text.with(color).to_string()
    } else {
        text
    }
}

/// Column header, e.g. `In Progress (3)`.
#[must_use]
pub fn format_column_header(status: Status, count: usize, width: usize, colors: bool) -> String {
    let header = pad_to_width(&format!("{} ({count})", status.as_str()), width);
    if colors {
        header.with(status_color(status)).bold().to_string()
    } else {
        header
    }
}

fn format_card_cell(issue: &Issue, now: DateTime<Utc>, width: usize, colors: bool) -> String {
    let badge = format_severity_badge(issue.severity);
    let rest = format!(
        " #{} {} ({})",
        issue.id,
        issue.title,
        compute_priority_score(issue, now)
    );
    let rest_width = width.saturating_sub(badge.width());
    let badge = paint(badge, severity_color(issue.severity_level()), colors);
    format!("{badge}{}", pad_to_width(&rest, rest_width))
}

/// Lay out the three columns side by side in `total_width` columns.
///
/// Falls back to one column after another when the terminal is too narrow.
#[must_use]
pub fn render_board(
    columns: &BoardColumns,
    now: DateTime<Utc>,
    total_width: usize,
    colors: bool,
) -> String {
    let gaps = COLUMN_GAP.width() * (Status::ALL.len() - 1);
    let width = total_width.saturating_sub(gaps) / Status::ALL.len();
    if width < MIN_COLUMN_WIDTH {
        return render_stacked(columns, now, colors);
    }

    let mut out = String::new();
    let headers: Vec<String> = Status::ALL
        .iter()
        .map(|&s| format_column_header(s, columns.column(s).len(), width, colors))
        .collect();
    out.push_str(headers.join(COLUMN_GAP).trim_end());
    out.push('\n');
    let rule = "─".repeat(width);
    out.push_str(&vec![rule; Status::ALL.len()].join(COLUMN_GAP));
    out.push('\n');

    let rows = Status::ALL
        .iter()
        .map(|&s| columns.column(s).len())
        .max()
        .unwrap_or(0);
    for row in 0..rows {
        let cells: Vec<String> = Status::ALL
            .iter()
            .map(|&s| {
                columns.column(s).get(row).map_or_else(
                    || " ".repeat(width),
                    |issue| format_card_cell(issue, now, width, colors),
                )
            })
            .collect();
        out.push_str(cells.join(COLUMN_GAP).trim_end());
        out.push('\n');
    }
    out
}

fn render_stacked(columns: &BoardColumns, now: DateTime<Utc>, colors: bool) -> String {
    let mut out = String::new();
    for status in Status::ALL {
        let issues = columns.column(status);
        let header = format!("{} ({})", status.as_str(), issues.len());
        out.push_str(&paint(header, status_color(status), colors));
        out.push('\n');
        for issue in issues {
            out.push_str("  ");
            out.push_str(&format_scored_line(issue, now));
            out.push('\n');
        }
    }
    out
}

/// Multi-line detail block for `show`.
#[must_use]
pub fn format_issue_details(issue: &Issue, now: DateTime<Utc>, colors: bool) -> String {
    let level = issue.severity_level();
    let badge = paint(
        format_severity_badge(issue.severity),
        severity_color(level),
        colors,
    );
    let status = paint(
        issue.status.as_str().to_string(),
        status_color(issue.status),
        colors,
    );
    let assignee = if issue.assignee.is_empty() {
        "(unassigned)"
    } else {
        issue.assignee.as_str()
    };

    let mut out = format!("#{} {}\n", issue.id, issue.title);
    out.push_str(&format!("  Status:    {status}\n"));
    out.push_str(&format!("  Priority:  {}\n", issue.priority));
    out.push_str(&format!("  Severity:  {badge} {}\n", severity_label(level)));
    out.push_str(&format!("  Assignee:  {assignee}\n"));
    if !issue.tags.is_empty() {
        out.push_str(&format!("  Tags:      {}\n", issue.tags.join(", ")));
    }
    out.push_str(&format!(
        "  Created:   {}\n",
        issue.created_at.format("%B %-d, %Y %H:%M")
    ));
    if let Some(rank) = issue.user_defined_rank {
        out.push_str(&format!("  Rank:      {rank}\n"));
    }
    out.push_str(&format!(
        "  Score:     {}\n",
        compute_priority_score(issue, now)
    ));
    out
}

/// One-line summary of the active filters, or `None` when nothing filters.
#[must_use]
pub fn format_filters(filters: &FilterState) -> Option<String> {
    let mut parts = Vec::new();
    let query = filters.search_query.trim();
    if !query.is_empty() {
        parts.push(format!("search \"{query}\""));
    }
    if !filters.assignee_filter.is_empty() {
        parts.push(format!("assignee {}", filters.assignee_filter));
    }
    if let Some(severity) = filters.severity_filter {
        parts.push(format!("severity {severity}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Filters: {}", parts.join(", ")))
    }
}

/// Toast line for a store notice.
#[must_use]
pub fn format_notice(notice: &Notice, colors: bool) -> String {
    let (mark, color) = match notice.level {
        NoticeLevel::Success => ("✓", Color::Green),
        NoticeLevel::Error => ("✗", Color::Red),
    };
    paint(format!("{mark} {}", notice.message), color, colors)
}
