//! Priority scoring and the filter/sort pipeline behind the board columns.
//!
//! Everything here is pure: inputs are never mutated and the same inputs
//! (including `now`) always produce the same output.

use chrono::{DateTime, Utc};

use crate::model::{Issue, Status};

/// `severity * 10 - days_since_created + user_defined_rank`.
///
/// Days are whole days truncated toward zero. Scores are not clamped.
#[must_use]
pub fn compute_priority_score(issue: &Issue, now: DateTime<Utc>) -> i64 {
    let days_since_created = (now - issue.created_at).num_days();
    i64::from(issue.severity) * 10 - days_since_created + i64::from(issue.rank())
}

/// Sort by descending score, newest first on ties, using the current time.
#[must_use]
pub fn sort_by_priority(issues: &[Issue]) -> Vec<Issue> {
    sort_by_priority_at(issues, Utc::now())
}

/// Sort by descending score, newest first on ties.
///
/// The sort is stable: issues with equal score and equal `created_at`
/// keep their input order.
#[must_use]
pub fn sort_by_priority_at(issues: &[Issue], now: DateTime<Utc>) -> Vec<Issue> {
    let mut scored: Vec<(i64, &Issue)> = issues
        .iter()
        .map(|issue| (compute_priority_score(issue, now), issue))
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    scored.into_iter().map(|(_, issue)| issue.clone()).collect()
}

/// Filter by search text, assignee and severity, then sort by priority.
#[must_use]
pub fn filter_and_sort(
    issues: &[Issue],
    search_query: &str,
    assignee_filter: &str,
    severity_filter: Option<i32>,
) -> Vec<Issue> {
    filter_and_sort_at(
        issues,
        search_query,
        assignee_filter,
        severity_filter,
        Utc::now(),
    )
}

/// [`filter_and_sort`] with an explicit clock.
#[must_use]
pub fn filter_and_sort_at(
    issues: &[Issue],
    search_query: &str,
    assignee_filter: &str,
    severity_filter: Option<i32>,
    now: DateTime<Utc>,
) -> Vec<Issue> {
    let query = if search_query.trim().is_empty() {
        None
    } else {
        Some(search_query.to_lowercase())
    };

    let filtered: Vec<Issue> = issues
        .iter()
        .filter(|issue| query.as_deref().is_none_or(|q| matches_search(issue, q)))
        .filter(|issue| assignee_filter.is_empty() || issue.assignee == assignee_filter)
        .filter(|issue| severity_filter.is_none_or(|severity| issue.severity == severity))
        .cloned()
        .collect();

    sort_by_priority_at(&filtered, now)
}

/// Title or any tag contains the already lower-cased query.
fn matches_search(issue: &Issue, query_lower: &str) -> bool {
    issue.title.to_lowercase().contains(query_lower)
        || issue
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(query_lower))
}

/// Sorted, deduplicated assignee names.
#[must_use]
pub fn unique_assignees(issues: &[Issue]) -> Vec<String> {
    let mut names: Vec<String> = issues.iter().map(|i| i.assignee.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// A filtered, sorted issue set split into board columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardColumns {
    pub backlog: Vec<Issue>,
    pub in_progress: Vec<Issue>,
    pub done: Vec<Issue>,
}

impl BoardColumns {
    /// Split `sorted` by status, keeping its order inside each column.
    #[must_use]
    pub fn from_issues(sorted: Vec<Issue>) -> Self {
        let mut columns = Self::default();
        for issue in sorted {
            match issue.status {
                Status::Backlog => columns.backlog.push(issue),
                Status::InProgress => columns.in_progress.push(issue),
                Status::Done => columns.done.push(issue),
            }
        }
        columns
    }

    #[must_use]
    pub fn column(&self, status: Status) -> &[Issue] {
        match status {
            Status::Backlog => &self.backlog,
            Status::InProgress => &self.in_progress,
            Status::Done => &self.done,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backlog.len() + self.in_progress.len() + self.done.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
