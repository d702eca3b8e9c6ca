use board_core::scoring::compute_priority_score;
use board_core::{BoardColumns, FilterState, Issue, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text::severity_label;

/// Issue with its priority score at render time (list/show/recent).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub score: i64,
    pub severity_level: String,
}

impl ScoredIssue {
    #[must_use]
    pub fn new(issue: Issue, now: DateTime<Utc>) -> Self {
        let score = compute_priority_score(&issue, now);
        let severity_level = severity_label(issue.severity_level()).to_string();
        Self {
            issue,
            score,
            severity_level,
        }
    }
}

/// One board column in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub status: Status,
    pub count: usize,
    pub issues: Vec<ScoredIssue>,
}

/// The filtered board as printed by `list --json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub filters: FilterState,
    pub total: usize,
    pub columns: Vec<ColumnView>,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl BoardView {
    #[must_use]
    pub fn new(
        columns: &BoardColumns,
        filters: FilterState,
        last_sync_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let columns: Vec<ColumnView> = Status::ALL
            .iter()
            .map(|&status| {
                let issues: Vec<ScoredIssue> = columns
                    .column(status)
                    .iter()
                    .cloned()
                    .map(|issue| ScoredIssue::new(issue, now))
                    .collect();
                ColumnView {
                    status,
                    count: issues.len(),
                    issues,
                }
            })
            .collect();

        Self {
            filters,
            total: columns.iter().map(|c| c.count).sum(),
            columns,
            last_sync_time,
        }
    }
}
