//! Scriptable issue service for store tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::{BoardError, Result};
use crate::model::{Issue, Status};
use crate::query::IssuePatch;
use crate::service::IssueService;

/// In-memory backend with switchable failures and per-call latency.
///
/// `fetch_all` captures the issue set when the call starts, like a server
/// answering the request it received.
pub struct FakeService {
    issues: Mutex<Vec<Issue>>,
    latency: Duration,
    fetch_latencies: Mutex<VecDeque<Duration>>,
    fail_fetch: AtomicBool,
    fail_updates: AtomicBool,
    fetch_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl FakeService {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            latency: Duration::from_millis(500),
            fetch_latencies: Mutex::new(VecDeque::new()),
            fail_fetch: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Latencies consumed by the next `fetch_all` calls, in order.
    pub fn script_fetch_latencies(&self, latencies: impl IntoIterator<Item = Duration>) {
        self.lock_latencies().extend(latencies);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.lock_issues() = issues;
    }

    pub fn backend_issue(&self, id: &str) -> Option<Issue> {
        self.lock_issues().iter().find(|issue| issue.id == id).cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn lock_issues(&self) -> std::sync::MutexGuard<'_, Vec<Issue>> {
        self.issues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_latencies(&self) -> std::sync::MutexGuard<'_, VecDeque<Duration>> {
        self.fetch_latencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IssueService for FakeService {
    async fn fetch_all(&self) -> Result<Vec<Issue>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.lock_latencies().pop_front().unwrap_or(self.latency);
        let issues = self.lock_issues().clone();
        let fail = self.fail_fetch.load(Ordering::SeqCst);

        tokio::time::sleep(latency).await;
        if fail {
            return Err(BoardError::Backend("service unreachable".into()));
        }
        Ok(issues)
    }

    async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Issue> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(BoardError::Backend("update rejected".into()));
        }

        let mut issues = self.lock_issues();
        let issue = issues
            .iter_mut()
            .find(|issue| issue.id == id)
            .ok_or_else(|| BoardError::IssueNotFound { id: id.to_string() })?;
        patch.apply_to(issue);
        Ok(issue.clone())
    }
}

/// Three issues across the columns with distinct assignees.
pub fn sample_issues() -> Vec<Issue> {
    let created = |day| Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap();
    vec![
        Issue {
            id: "1".into(),
            title: "Login redirect loop".into(),
            status: Status::Backlog,
            severity: 3,
            created_at: created(2),
            assignee: "Alice".into(),
            tags: vec!["bug".into(), "auth".into()],
            ..Default::default()
        },
        Issue {
            id: "2".into(),
            title: "Dark mode toggle".into(),
            status: Status::InProgress,
            severity: 1,
            created_at: created(5),
            assignee: "Bob".into(),
            tags: vec!["ui".into()],
            ..Default::default()
        },
        Issue {
            id: "3".into(),
            title: "Upgrade database driver".into(),
            status: Status::Done,
            severity: 2,
            created_at: created(8),
            assignee: "Carol".into(),
            tags: vec!["infra".into()],
            user_defined_rank: Some(2),
            ..Default::default()
        },
    ]
}
