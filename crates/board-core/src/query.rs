//! Patch and filter types for board operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Issue, Priority, Status};

/// Fields to update on an issue. `None` leaves a field untouched.
///
/// `id` and `created_at` are immutable and therefore not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_defined_rank: Option<Option<i32>>,
}

impl IssuePatch {
    /// Patch that only moves an issue to another column.
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch that resets every mutable field to the values of `issue`.
    ///
    /// Used to tell the backend about an undo.
    #[must_use]
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            title: Some(issue.title.clone()),
            status: Some(issue.status),
            priority: Some(issue.priority),
            severity: Some(issue.severity),
            assignee: Some(issue.assignee.clone()),
            tags: Some(issue.tags.clone()),
            user_defined_rank: Some(issue.user_defined_rank),
        }
    }

    /// Merge the patch into `issue` in place.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(ref title) = self.title {
            issue.title.clone_from(title);
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(severity) = self.severity {
            issue.severity = severity;
        }
        if let Some(ref assignee) = self.assignee {
            issue.assignee.clone_from(assignee);
        }
        if let Some(ref tags) = self.tags {
            issue.tags.clone_from(tags);
        }
        if let Some(rank) = self.user_defined_rank {
            issue.user_defined_rank = rank;
        }
    }
}

/// Board filters. Empty / absent criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub search_query: String,
    pub assignee_filter: String,
    pub severity_filter: Option<i32>,
}

impl FilterState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_query.trim().is_empty()
            && self.assignee_filter.is_empty()
            && self.severity_filter.is_none()
    }

    /// Filter and sort `issues` with these criteria.
    #[must_use]
    pub fn apply(&self, issues: &[Issue], now: DateTime<Utc>) -> Vec<Issue> {
        crate::scoring::filter_and_sort_at(
            issues,
            &self.search_query,
            &self.assignee_filter,
            self.severity_filter,
            now,
        )
    }
}
