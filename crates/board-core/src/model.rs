//! Core data types for the issue board.
//!
//! Same serde format as the seed data (`createdAt`, `userDefinedRank`,
//! `"In Progress"`), so backend snapshots and seed files are interoperable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BoardError;

/// Board column an issue lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Backlog,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl Status {
    /// Column order on the board.
    pub const ALL: [Self; 3] = [Self::Backlog, Self::InProgress, Self::Done];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backlog" => Ok(Self::Backlog),
            "in progress" | "in_progress" | "in-progress" | "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(BoardError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Advisory priority label. Not used in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(BoardError::InvalidPriority {
                priority: other.to_string(),
            }),
        }
    }
}

/// Visual urgency bucket derived from `Issue::severity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeverityLevel {
    Low,
    Medium,
    Critical,
}

impl SeverityLevel {
    /// Severity 3 and above is maximal.
    #[must_use]
    pub const fn from_severity(severity: i32) -> Self {
        if severity >= 3 {
            Self::Critical
        } else if severity == 2 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// The primary issue entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Unique, immutable ID.
    pub id: String,

    pub title: String,

    /// Board column.
    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub priority: Priority,

    /// Conventionally 1-3; drives the score.
    pub severity: i32,

    /// Creation timestamp. Immutable.
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub assignee: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Manual boost added to the priority score (0 when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_defined_rank: Option<i32>,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            status: Status::default(),
            priority: Priority::default(),
            severity: 1,
            created_at: Utc::now(),
            assignee: String::new(),
            tags: Vec::new(),
            user_defined_rank: None,
        }
    }
}

impl Issue {
    #[must_use]
    pub fn rank(&self) -> i32 {
        self.user_defined_rank.unwrap_or(0)
    }

    #[must_use]
    pub const fn severity_level(&self) -> SeverityLevel {
        SeverityLevel::from_severity(self.severity)
    }
}

/// The single outstanding undo window.
///
/// `token` is the identity of the window: the expiry timer and the update
/// that created it only ever clear the window carrying their own token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoState {
    pub previous_issue: Issue,
    pub timestamp: DateTime<Utc>,
    pub(crate) token: u64,
}
