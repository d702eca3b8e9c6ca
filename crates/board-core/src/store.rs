//! The Issue Store: single source of truth for the board.
//!
//! [`IssueStore`] is a cheap `Clone` handle. State lives in a
//! `tokio::sync::watch` channel, so every mutation is a short critical
//! section and observers see each committed state. Calls that reach the
//! Issue Service run on spawned tasks; the in-memory part of an update or
//! undo is applied before the call returns.
//!
//! Failures of the five store kinds are recovered here: the state is
//! repaired, a [`Notice`] goes out on the notice stream, and the error is
//! returned to the caller.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::{BoardError, ErrorKind, Result};
use crate::model::{Issue, UndoState};
use crate::polling::PollingController;
use crate::query::{FilterState, IssuePatch};
use crate::scoring::BoardColumns;
use crate::service::IssueService;
use crate::snapshot::{self, BOARD_STATE_KEY, PersistedBoard, SnapshotStore};
use crate::validation::{CollectionValidator, PatchValidator};

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_POLLING_INTERVAL: Duration = Duration::from_secs(60);

/// How long an update stays undoable.
pub const UNDO_WINDOW: Duration = Duration::from_secs(5);

/// Length of the recently-accessed list.
pub const RECENT_LIMIT: usize = 5;

const NOTICE_CAPACITY: usize = 64;

const MSG_FETCH_FAILED: &str = "Failed to fetch issues";
const MSG_ISSUE_NOT_FOUND: &str = "Issue not found";
const MSG_UPDATE_REJECTED: &str = "Failed to update issue. Changes have been reverted.";
const MSG_NOTHING_TO_UNDO: &str = "Nothing to undo";
const MSG_UNDO_SUCCEEDED: &str = "Changes undone successfully";
const MSG_UNDO_FAILED: &str = "Failed to undo changes";

/// Check a polling period against the accepted range.
///
/// # Errors
///
/// Returns `InvalidPollingInterval` outside 5..=60 seconds.
pub fn validate_polling_interval(interval: Duration) -> Result<()> {
    if (MIN_POLLING_INTERVAL..=MAX_POLLING_INTERVAL).contains(&interval) {
        Ok(())
    } else {
        Err(BoardError::InvalidPollingInterval {
            got: interval,
            min: MIN_POLLING_INTERVAL,
            max: MAX_POLLING_INTERVAL,
        })
    }
}

/// Construction options for [`IssueStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub polling_interval: Duration,
    pub undo_window: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            undo_window: UNDO_WINDOW,
        }
    }
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    /// Live issue collection, empty until the first successful fetch.
    pub issues: Vec<Issue>,
    pub loading: bool,
    /// Message of the last failed fetch, cleared by the next fetch.
    pub error: Option<String>,
    pub filters: FilterState,
    pub undo_state: Option<UndoState>,
    /// Most recent first, at most [`RECENT_LIMIT`] ids.
    pub recently_accessed_ids: Vec<String>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub polling_interval: Duration,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            issues: Vec::new(),
            loading: false,
            error: None,
            filters: FilterState::default(),
            undo_state: None,
            recently_accessed_ids: Vec::new(),
            last_sync_time: None,
            polling_interval: DEFAULT_POLLING_INTERVAL,
        }
    }
}

impl BoardState {
    fn persisted(&self) -> PersistedBoard {
        PersistedBoard {
            filters: self.filters.clone(),
            recently_accessed_ids: self.recently_accessed_ids.clone(),
            last_sync_time: self.last_sync_time,
        }
    }

    fn restore(&mut self, board: PersistedBoard) {
        self.filters = board.filters;
        self.recently_accessed_ids = board.recently_accessed_ids;
        self.recently_accessed_ids.truncate(RECENT_LIMIT);
        self.last_sync_time = board.last_sync_time;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Set for error notices raised by one of the store kinds.
    pub kind: Option<ErrorKind>,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.to_string(),
            kind: None,
        }
    }

    fn error(kind: ErrorKind, message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.to_string(),
            kind: Some(kind),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a [`IssueStore::fetch_all`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the collection.
    Applied { count: usize },
    /// A later fetch was issued before this one resolved; the response was dropped.
    Superseded,
}

/// Handle to the service call behind an update or undo.
///
/// Dropping it detaches the call; the store still finishes the protocol.
#[derive(Debug)]
pub struct PendingUpdate {
    id: String,
    handle: JoinHandle<Result<Issue>>,
}

impl PendingUpdate {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the service to answer.
    ///
    /// # Errors
    ///
    /// Returns `UpdateRejected` (already rolled back) for a rejected update, or
    /// `UndoReversionFailed` for an undo the service could not apply.
    pub async fn wait(self) -> Result<Issue> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(BoardError::UpdateRejected {
                id: self.id,
                reason: join_err.to_string(),
            }),
        }
    }
}

struct Inner {
    state: watch::Sender<BoardState>,
    notices: broadcast::Sender<Notice>,
    service: Arc<dyn IssueService>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    polling: Mutex<PollingController>,
    fetch_generation: AtomicU64,
    undo_tokens: AtomicU64,
    undo_window: Duration,
}

impl Inner {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::debug!("{notice}"),
            NoticeLevel::Error => tracing::info!(kind = ?notice.kind, "{notice}"),
        }
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    fn lock_polling(&self) -> MutexGuard<'_, PollingController> {
        self.polling.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the undo window if it is still the one identified by `token`.
    fn clear_undo_if(&self, token: u64) -> bool {
        self.state.send_if_modified(|state| {
            if state.undo_state.as_ref().is_some_and(|undo| undo.token == token) {
                state.undo_state = None;
                true
            } else {
                false
            }
        })
    }

    /// Put `previous` back and close the window created by the same update.
    fn roll_back(&self, previous: &Issue, token: u64) {
        self.state.send_modify(|state| {
            if let Some(slot) = state.issues.iter_mut().find(|i| i.id == previous.id) {
                slot.clone_from(previous);
            }
            if state.undo_state.as_ref().is_some_and(|undo| undo.token == token) {
                state.undo_state = None;
            }
        });
    }

    fn persist(&self) {
        let Some(snapshots) = self.snapshots.as_deref() else {
            return;
        };
        let board = self.state.borrow().persisted();
        if let Err(e) = snapshot::save_json(snapshots, BOARD_STATE_KEY, &board) {
            tracing::warn!("Failed to persist board state: {e}");
        }
    }
}

/// Owned board store. Clones share the same state.
#[derive(Clone)]
pub struct IssueStore {
    inner: Arc<Inner>,
}

impl IssueStore {
    /// Store without persistence and with default options.
    #[must_use]
    pub fn new(service: Arc<dyn IssueService>) -> Self {
        Self::build(service, None, BoardState::default(), UNDO_WINDOW)
    }

    /// Store restoring filters, recency and last sync time from `snapshots`.
    ///
    /// A missing or unreadable snapshot yields the default state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPollingInterval` if `options.polling_interval` is out of range.
    pub fn open(
        service: Arc<dyn IssueService>,
        snapshots: Arc<dyn SnapshotStore>,
        options: StoreOptions,
    ) -> Result<Self> {
        validate_polling_interval(options.polling_interval)?;

        let mut state = BoardState {
            polling_interval: options.polling_interval,
            ..BoardState::default()
        };
        state.restore(snapshot::load_board_or_default(snapshots.as_ref()));

        Ok(Self::build(
            service,
            Some(snapshots),
            state,
            options.undo_window,
        ))
    }

    fn build(
        service: Arc<dyn IssueService>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
        state: BoardState,
        undo_window: Duration,
    ) -> Self {
        let (state, _) = watch::channel(state);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state,
                notices,
                service,
                snapshots,
                polling: Mutex::new(PollingController::new()),
                fetch_generation: AtomicU64::new(0),
                undo_tokens: AtomicU64::new(0),
                undo_window,
            }),
        }
    }

    // === Read access ===

    /// Cloned view of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> BoardState {
        self.inner.state.borrow().clone()
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.inner.state.subscribe()
    }

    /// Observe notifications raised from now on.
    #[must_use]
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    #[must_use]
    pub fn issues(&self) -> Vec<Issue> {
        self.inner.state.borrow().issues.clone()
    }

    #[must_use]
    pub fn issue(&self, id: &str) -> Option<Issue> {
        self.inner
            .state
            .borrow()
            .issues
            .iter()
            .find(|issue| issue.id == id)
            .cloned()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    #[must_use]
    pub fn filters(&self) -> FilterState {
        self.inner.state.borrow().filters.clone()
    }

    #[must_use]
    pub fn undo_state(&self) -> Option<UndoState> {
        self.inner.state.borrow().undo_state.clone()
    }

    #[must_use]
    pub fn recently_accessed_ids(&self) -> Vec<String> {
        self.inner.state.borrow().recently_accessed_ids.clone()
    }

    #[must_use]
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.state.borrow().last_sync_time
    }

    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        self.inner.state.borrow().polling_interval
    }

    /// Filtered, priority-sorted columns for the current filters.
    #[must_use]
    pub fn board_view(&self) -> BoardColumns {
        self.board_view_at(Utc::now())
    }

    #[must_use]
    pub fn board_view_at(&self, now: DateTime<Utc>) -> BoardColumns {
        let state = self.inner.state.borrow();
        BoardColumns::from_issues(state.filters.apply(&state.issues, now))
    }

    /// The recency list resolved against the live collection. Unknown ids are skipped.
    #[must_use]
    pub fn recent_issues(&self) -> Vec<Issue> {
        let state = self.inner.state.borrow();
        state
            .recently_accessed_ids
            .iter()
            .filter_map(|id| state.issues.iter().find(|issue| &issue.id == id))
            .cloned()
            .collect()
    }

    /// Dismiss the error line. Subscribers only hear about it if one was set.
    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|state| state.error.take().is_some());
    }

    // === Fetch ===

    /// Load the full issue set from the service.
    ///
    /// Only the most recently issued fetch may commit: an older response that
    /// arrives late is dropped and reported as [`FetchOutcome::Superseded`].
    ///
    /// # Errors
    ///
    /// Returns `FetchFailed` when the service fails or returns an invalid set.
    /// The existing issues are kept and `error` is set.
    pub async fn fetch_all(&self) -> Result<FetchOutcome> {
        let generation = self.inner.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self
            .inner
            .service
            .fetch_all()
            .await
            .and_then(|issues| CollectionValidator::validate(&issues).map(|()| issues));

        match result {
            Ok(issues) => {
                let count = issues.len();
                let now = Utc::now();
                let committed = self.commit_fetch(generation, |state| {
                    state.issues = issues;
                    state.last_sync_time = Some(now);
                });
                if !committed {
                    tracing::debug!(generation, "Discarding superseded fetch response");
                    return Ok(FetchOutcome::Superseded);
                }
                self.inner.persist();
                tracing::debug!(count, "Fetched issues");
                Ok(FetchOutcome::Applied { count })
            }
            Err(e) => {
                let committed = self.commit_fetch(generation, |state| {
                    state.error = Some(MSG_FETCH_FAILED.to_string());
                });
                if !committed {
                    tracing::debug!(generation, "Discarding superseded fetch failure: {e}");
                    return Ok(FetchOutcome::Superseded);
                }
                self.inner
                    .notify(Notice::error(ErrorKind::FetchFailed, MSG_FETCH_FAILED));
                Err(BoardError::FetchFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Apply a fetch result and clear `loading` if `generation` is still current.
    fn commit_fetch(&self, generation: u64, apply: impl FnOnce(&mut BoardState)) -> bool {
        self.inner.state.send_if_modified(|state| {
            if self.inner.fetch_generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            apply(state);
            state.loading = false;
            true
        })
    }

    // === Optimistic update & undo ===

    /// Apply `patch` to issue `id` now and send it to the service.
    ///
    /// On return the patched issue is visible and the undo window is open.
    /// If the service rejects the update the issue is restored from the
    /// snapshot taken here and the window this call opened is closed.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for an unknown id, or a validation error for a
    /// patch that would break the issue. Nothing is changed in either case.
    pub fn update_issue(&self, id: &str, patch: IssuePatch) -> Result<PendingUpdate> {
        PatchValidator::validate(&patch)?;

        let token = self.inner.undo_tokens.fetch_add(1, Ordering::SeqCst) + 1;
        let mut previous = None;
        self.inner.state.send_if_modified(|state| {
            let Some(issue) = state.issues.iter_mut().find(|issue| issue.id == id) else {
                return false;
            };
            let before = issue.clone();
            patch.apply_to(issue);
            state.undo_state = Some(UndoState {
                previous_issue: before.clone(),
                timestamp: Utc::now(),
                token,
            });
            previous = Some(before);
            true
        });

        let Some(previous) = previous else {
            self.inner
                .notify(Notice::error(ErrorKind::IssueNotFound, MSG_ISSUE_NOT_FOUND));
            return Err(BoardError::IssueNotFound { id: id.to_string() });
        };

        self.schedule_undo_expiry(token);

        let inner = Arc::clone(&self.inner);
        let issue_id = id.to_string();
        let handle = tokio::spawn(async move {
            match inner.service.update(&previous.id, &patch).await {
                Ok(issue) => {
                    tracing::debug!(id = %issue.id, "Update accepted");
                    Ok(issue)
                }
                Err(e) => {
                    inner.roll_back(&previous, token);
                    inner.notify(Notice::error(
                        ErrorKind::UpdateRejected,
                        MSG_UPDATE_REJECTED,
                    ));
                    Err(BoardError::UpdateRejected {
                        id: previous.id,
                        reason: e.to_string(),
                    })
                }
            }
        });

        Ok(PendingUpdate {
            id: issue_id,
            handle,
        })
    }

    fn schedule_undo_expiry(&self, token: u64) {
        let weak = Arc::downgrade(&self.inner);
        let window = self.inner.undo_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.clear_undo_if(token) {
                tracing::trace!(token, "Undo window expired");
            }
        });
    }

    /// Revert the most recent update.
    ///
    /// The issue is restored and the window closed before this returns. The
    /// service is told afterwards; if that fails the local revert stands.
    ///
    /// # Errors
    ///
    /// Returns `NothingToUndo` without an open window, or `IssueNotFound` if
    /// the issue left the collection since the update.
    pub fn undo(&self) -> Result<PendingUpdate> {
        let mut taken = None;
        self.inner.state.send_if_modified(|state| {
            let Some(undo) = state.undo_state.take() else {
                return false;
            };
            let mut restored = false;
            if let Some(slot) = state
                .issues
                .iter_mut()
                .find(|issue| issue.id == undo.previous_issue.id)
            {
                slot.clone_from(&undo.previous_issue);
                restored = true;
            }
            taken = Some((undo.previous_issue, restored));
            true
        });

        let Some((previous, restored)) = taken else {
            self.inner
                .notify(Notice::error(ErrorKind::NothingToUndo, MSG_NOTHING_TO_UNDO));
            return Err(BoardError::NothingToUndo);
        };
        if !restored {
            self.inner
                .notify(Notice::error(ErrorKind::IssueNotFound, MSG_ISSUE_NOT_FOUND));
            return Err(BoardError::IssueNotFound { id: previous.id });
        }

        let inner = Arc::clone(&self.inner);
        let issue_id = previous.id.clone();
        let handle = tokio::spawn(async move {
            let patch = IssuePatch::from_issue(&previous);
            match inner.service.update(&previous.id, &patch).await {
                Ok(issue) => {
                    inner.notify(Notice::success(MSG_UNDO_SUCCEEDED));
                    Ok(issue)
                }
                Err(e) => {
                    inner.notify(Notice::error(
                        ErrorKind::UndoReversionFailed,
                        MSG_UNDO_FAILED,
                    ));
                    Err(BoardError::UndoReversionFailed {
                        id: previous.id,
                        reason: e.to_string(),
                    })
                }
            }
        });

        Ok(PendingUpdate {
            id: issue_id,
            handle,
        })
    }

    // === Filters & recency ===

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.update_filters(|filters| filters.search_query = query);
    }

    pub fn set_assignee_filter(&self, assignee: impl Into<String>) {
        let assignee = assignee.into();
        self.update_filters(|filters| filters.assignee_filter = assignee);
    }

    pub fn set_severity_filter(&self, severity: Option<i32>) {
        self.update_filters(|filters| filters.severity_filter = severity);
    }

    pub fn reset_filters(&self) {
        self.update_filters(|filters| *filters = FilterState::default());
    }

    fn update_filters(&self, change: impl FnOnce(&mut FilterState)) {
        let changed = self.inner.state.send_if_modified(|state| {
            let before = state.filters.clone();
            change(&mut state.filters);
            state.filters != before
        });
        if changed {
            self.inner.persist();
        }
    }

    /// Move `id` to the front of the recency list.
    pub fn add_recently_accessed(&self, id: &str) {
        let changed = self.inner.state.send_if_modified(|state| {
            let ids = &mut state.recently_accessed_ids;
            if ids.first().is_some_and(|first| first == id) {
                return false;
            }
            ids.retain(|existing| existing != id);
            ids.insert(0, id.to_string());
            ids.truncate(RECENT_LIMIT);
            true
        });
        if changed {
            self.inner.persist();
        }
    }

    // === Polling ===

    /// Fetch now, then every polling interval. Replaces a running timer.
    pub fn start_polling(&self) {
        let mut polling = self.inner.lock_polling();
        let period = self.polling_interval();
        polling.start(period, self.poll_tick());
        drop(polling);
        tracing::debug!(?period, "Polling started");
    }

    /// Cancel future polls. Fetches already in flight complete normally.
    pub fn stop_polling(&self) {
        if self.inner.lock_polling().stop() {
            tracing::debug!("Polling stopped");
        }
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.lock_polling().is_running()
    }

    /// Change the polling period, restarting the timer if it is running.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPollingInterval` outside 5..=60 seconds.
    pub fn set_polling_interval(&self, interval: Duration) -> Result<()> {
        validate_polling_interval(interval)?;

        let mut polling = self.inner.lock_polling();
        self.inner.state.send_if_modified(|state| {
            let changed = state.polling_interval != interval;
            state.polling_interval = interval;
            changed
        });
        if polling.is_running() && polling.period() != Some(interval) {
            polling.start(interval, self.poll_tick());
            tracing::debug!(?interval, "Polling restarted");
        }
        drop(polling);
        Ok(())
    }

    fn poll_tick(&self) -> impl FnMut() -> ControlFlow<()> + Send + 'static {
        let weak = Arc::downgrade(&self.inner);
        move || {
            let Some(inner) = weak.upgrade() else {
                return ControlFlow::Break(());
            };
            let store = Self { inner };
            tokio::spawn(async move {
                if let Err(e) = store.fetch_all().await {
                    tracing::debug!("Polling fetch failed: {e}");
                }
            });
            ControlFlow::Continue(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use crate::snapshot::MemorySnapshots;
    use crate::test_support::{FakeService, sample_issues};

    fn store_with(service: &Arc<FakeService>) -> IssueStore {
        IssueStore::new(service.clone())
    }

    async fn loaded_store() -> (Arc<FakeService>, IssueStore) {
        let service = Arc::new(FakeService::new(sample_issues()));
        let store = store_with(&service);
        store.fetch_all().await.unwrap();
        (service, store)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    // === Fetch ===

    #[tokio::test(start_paused = true)]
    async fn test_fetch_replaces_issues_and_stamps_sync() {
        let service = Arc::new(FakeService::new(sample_issues()));
        let store = store_with(&service);
        assert!(store.issues().is_empty());
        assert_eq!(store.last_sync_time(), None);

        let outcome = store.fetch_all().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Applied { count: 3 });
        assert_eq!(store.issues().len(), 3);
        assert!(store.last_sync_time().is_some());
        assert!(!store.is_loading());
        assert_eq!(store.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_is_set_while_fetching() {
        let service = Arc::new(FakeService::new(sample_issues()));
        let store = store_with(&service);

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all().await }
        });
        tokio::task::yield_now().await;
        assert!(store.is_loading());

        task.await.unwrap().unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_keeps_existing_issues() {
        let (service, store) = loaded_store().await;
        let synced = store.last_sync_time();
        let mut notices = store.subscribe_notices();

        service.fail_fetch(true);
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, BoardError::FetchFailed { .. }));
        assert_eq!(store.issues().len(), 3);
        assert_eq!(store.error().as_deref(), Some("Failed to fetch issues"));
        assert_eq!(store.last_sync_time(), synced);
        assert!(!store.is_loading());

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.kind, Some(ErrorKind::FetchFailed));

        service.fail_fetch(false);
        store.fetch_all().await.unwrap();
        assert_eq!(store.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_error_dismisses_without_touching_issues() {
        let (service, store) = loaded_store().await;
        service.fail_fetch(true);
        store.fetch_all().await.unwrap_err();
        let mut rx = store.subscribe();

        store.clear_error();
        assert_eq!(store.error(), None);
        assert_eq!(store.issues().len(), 3);
        assert!(rx.has_changed().unwrap());

        drop(rx.borrow_and_update());
        store.clear_error();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_rejects_duplicate_ids() {
        let mut issues = sample_issues();
        issues.push(issues[0].clone());
        let service = Arc::new(FakeService::new(issues));
        let store = store_with(&service);

        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, BoardError::FetchFailed { .. }));
        assert!(store.issues().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_keeps_unusual_field_values() {
        let mut issues = sample_issues();
        issues[0].severity = 0;
        issues[1].tags.push(String::new());
        issues[2].severity = -2;
        let service = Arc::new(FakeService::new(issues));
        let store = store_with(&service);

        let outcome = store.fetch_all().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Applied { count: 3 });
        assert_eq!(store.issues().len(), 3);
        assert_eq!(store.issue("1").unwrap().severity, 0);
        assert_eq!(store.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_of_older_fetch_is_dropped() {
        let service = Arc::new(FakeService::new(sample_issues()));
        service.script_fetch_latencies([ms(1000), ms(100)]);
        let store = store_with(&service);

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all().await }
        });
        tokio::task::yield_now().await;

        let mut grown = sample_issues();
        grown.push(Issue {
            id: "4".into(),
            title: "Newer issue".into(),
            ..Default::default()
        });
        service.set_issues(grown);

        let fast = store.fetch_all().await.unwrap();
        assert_eq!(fast, FetchOutcome::Applied { count: 4 });
        assert!(!store.is_loading());

        assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Superseded);
        assert_eq!(store.issues().len(), 4);
    }

    // === Optimistic update ===

    #[tokio::test(start_paused = true)]
    async fn test_update_unknown_id_changes_nothing() {
        let (service, store) = loaded_store().await;
        let before = store.snapshot();
        let mut notices = store.subscribe_notices();

        let err = store
            .update_issue("missing", IssuePatch::status(Status::Done))
            .unwrap_err();
        assert!(matches!(err, BoardError::IssueNotFound { ref id } if id == "missing"));
        assert_eq!(store.snapshot(), before);
        assert_eq!(service.update_count(), 0);
        assert_eq!(notices.try_recv().unwrap().kind, Some(ErrorKind::IssueNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_applies_before_service_answers() {
        let (service, store) = loaded_store().await;
        let started = tokio::time::Instant::now();

        let pending = store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();
        assert_eq!(pending.id(), "1");
        assert_eq!(store.issue("1").unwrap().status, Status::Done);
        assert_eq!(started.elapsed(), Duration::ZERO);

        let undo = store.undo_state().unwrap();
        assert_eq!(undo.previous_issue.status, Status::Backlog);
        assert_eq!(undo.previous_issue.id, "1");
        assert_eq!(service.backend_issue("1").unwrap().status, Status::Backlog);

        let merged = pending.wait().await.unwrap();
        assert_eq!(merged.status, Status::Done);
        assert_eq!(service.backend_issue("1").unwrap().status, Status::Done);
        assert_eq!(store.issue("1").unwrap().status, Status::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_patch_changes_nothing() {
        let (_, store) = loaded_store().await;
        let before = store.snapshot();
        let patch = IssuePatch {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_issue("1", patch),
            Err(BoardError::Validation { ref field, .. }) if field == "title"
        ));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_accepts_zero_severity() {
        let (service, store) = loaded_store().await;
        let patch = IssuePatch {
            severity: Some(0),
            ..Default::default()
        };
        let pending = store.update_issue("1", patch).unwrap();
        assert_eq!(store.issue("1").unwrap().severity, 0);
        assert_eq!(pending.wait().await.unwrap().severity, 0);
        assert_eq!(service.backend_issue("1").unwrap().severity, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_update_rolls_back() {
        let (service, store) = loaded_store().await;
        let mut notices = store.subscribe_notices();
        service.fail_updates(true);

        let pending = store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();
        assert_eq!(store.issue("1").unwrap().status, Status::Done);

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, BoardError::UpdateRejected { ref id, .. } if id == "1"));
        assert_eq!(store.issue("1").unwrap().status, Status::Backlog);
        assert_eq!(store.undo_state(), None);

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.kind, Some(ErrorKind::UpdateRejected));
        assert_eq!(
            notice.message,
            "Failed to update issue. Changes have been reverted."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_only_touches_its_own_issue() {
        let (service, store) = loaded_store().await;
        service.fail_updates(true);
        let first = store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();
        tokio::time::sleep(ms(200)).await;
        let second = store
            .update_issue("2", IssuePatch::status(Status::Done))
            .unwrap();

        first.wait().await.unwrap_err();
        assert_eq!(store.issue("1").unwrap().status, Status::Backlog);
        assert_eq!(store.issue("2").unwrap().status, Status::Done);
        // The window opened by the second update survives the first rollback.
        assert_eq!(store.undo_state().unwrap().previous_issue.id, "2");

        second.wait().await.unwrap_err();
        assert_eq!(store.issue("2").unwrap().status, Status::InProgress);
        assert_eq!(store.undo_state(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_update_replaces_undo_state() {
        let (_, store) = loaded_store().await;
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();
        store
            .update_issue("2", IssuePatch::status(Status::Backlog))
            .unwrap();
        let undo = store.undo_state().unwrap();
        assert_eq!(undo.previous_issue.id, "2");
        assert_eq!(undo.previous_issue.status, Status::InProgress);
    }

    // === Undo ===

    #[tokio::test(start_paused = true)]
    async fn test_undo_restores_and_clears() {
        let (service, store) = loaded_store().await;
        let mut notices = store.subscribe_notices();
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap()
            .wait()
            .await
            .unwrap();

        let pending = store.undo().unwrap();
        assert_eq!(store.issue("1").unwrap().status, Status::Backlog);
        assert_eq!(store.undo_state(), None);

        let before_second = store.snapshot();
        assert!(matches!(store.undo(), Err(BoardError::NothingToUndo)));
        assert_eq!(store.snapshot(), before_second);

        pending.wait().await.unwrap();
        assert_eq!(service.backend_issue("1").unwrap().status, Status::Backlog);

        let received: Vec<_> = std::iter::from_fn(|| notices.try_recv().ok()).collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].kind, Some(ErrorKind::NothingToUndo));
        assert_eq!(received[1].level, NoticeLevel::Success);
        assert_eq!(received[1].message, "Changes undone successfully");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reversion_keeps_local_undo() {
        let (service, store) = loaded_store().await;
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap()
            .wait()
            .await
            .unwrap();

        service.fail_updates(true);
        let err = store.undo().unwrap().wait().await.unwrap_err();
        assert!(matches!(err, BoardError::UndoReversionFailed { .. }));
        assert_eq!(store.issue("1").unwrap().status, Status::Backlog);
        assert_eq!(store.undo_state(), None);
        assert_eq!(service.backend_issue("1").unwrap().status, Status::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_after_issue_disappeared() {
        let (service, store) = loaded_store().await;
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap()
            .wait()
            .await
            .unwrap();

        service.set_issues(sample_issues().into_iter().skip(1).collect());
        store.fetch_all().await.unwrap();

        assert!(matches!(store.undo(), Err(BoardError::IssueNotFound { .. })));
        assert_eq!(store.undo_state(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_window_expires() {
        let (_, store) = loaded_store().await;
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();

        tokio::time::sleep(ms(4900)).await;
        assert!(store.undo_state().is_some());
        tokio::time::sleep(ms(200)).await;
        assert_eq!(store.undo_state(), None);
        assert!(matches!(store.undo(), Err(BoardError::NothingToUndo)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_window_outlives_old_timer() {
        let (_, store) = loaded_store().await;
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();
        tokio::time::sleep(ms(3000)).await;
        store
            .update_issue("2", IssuePatch::status(Status::Done))
            .unwrap();

        // First timer fires at 5s and must leave the second window alone.
        tokio::time::sleep(ms(2500)).await;
        assert_eq!(store.undo_state().unwrap().previous_issue.id, "2");

        tokio::time::sleep(ms(3000)).await;
        assert_eq!(store.undo_state(), None);
    }

    // === Filters & recency ===

    #[tokio::test]
    async fn test_filter_setters_touch_only_their_field() {
        let store = IssueStore::new(Arc::new(FakeService::new(sample_issues())));
        store.set_search_query("login");
        store.set_assignee_filter("Alice");
        store.set_severity_filter(Some(3));
        store.set_search_query("redirect");

        let filters = store.filters();
        assert_eq!(filters.search_query, "redirect");
        assert_eq!(filters.assignee_filter, "Alice");
        assert_eq!(filters.severity_filter, Some(3));

        store.reset_filters();
        assert_eq!(store.filters(), FilterState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_view_applies_filters() {
        let (_, store) = loaded_store().await;
        assert_eq!(store.board_view().len(), 3);

        store.set_assignee_filter("Bob");
        let view = store.board_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view.column(Status::InProgress)[0].id, "2");
    }

    #[tokio::test]
    async fn test_recent_list_truncates_to_five() {
        let store = IssueStore::new(Arc::new(FakeService::new(Vec::new())));
        for id in ["1", "2", "3", "4", "5", "6"] {
            store.add_recently_accessed(id);
        }
        assert_eq!(store.recently_accessed_ids(), vec!["6", "5", "4", "3", "2"]);
    }

    #[tokio::test]
    async fn test_recent_list_moves_reaccessed_to_front() {
        let store = IssueStore::new(Arc::new(FakeService::new(Vec::new())));
        for id in ["1", "2", "3", "1"] {
            store.add_recently_accessed(id);
        }
        assert_eq!(store.recently_accessed_ids(), vec!["1", "3", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_issues_skip_unknown_ids() {
        let (_, store) = loaded_store().await;
        store.add_recently_accessed("2");
        store.add_recently_accessed("gone");
        store.add_recently_accessed("3");
        let ids: Vec<_> = store.recent_issues().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = IssueStore::new(Arc::new(FakeService::new(Vec::new())));
        let mut rx = store.subscribe();
        store.set_search_query("auth");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().filters.search_query, "auth");

        // Setting the same value is not a change.
        store.set_search_query("auth");
        assert!(!rx.has_changed().unwrap());
    }

    // === Persistence ===

    #[tokio::test(start_paused = true)]
    async fn test_persisted_fields_survive_reopen() {
        let snapshots = Arc::new(MemorySnapshots::new());
        let service = Arc::new(FakeService::new(sample_issues()));

        let store =
            IssueStore::open(service.clone(), snapshots.clone(), StoreOptions::default())
                .unwrap();
        store.fetch_all().await.unwrap();
        store.set_search_query("bug");
        store.set_severity_filter(Some(2));
        store.add_recently_accessed("3");
        store
            .update_issue("1", IssuePatch::status(Status::Done))
            .unwrap();
        let synced = store.last_sync_time();
        drop(store);

        let reopened = IssueStore::open(service, snapshots, StoreOptions::default()).unwrap();
        let state = reopened.snapshot();
        assert_eq!(state.filters.search_query, "bug");
        assert_eq!(state.filters.severity_filter, Some(2));
        assert_eq!(state.recently_accessed_ids, vec!["3"]);
        assert_eq!(state.last_sync_time, synced);
        assert!(state.issues.is_empty());
        assert_eq!(state.undo_state, None);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_opens_with_defaults() {
        let snapshots = Arc::new(MemorySnapshots::new());
        snapshots.save(BOARD_STATE_KEY, "][").unwrap();
        let store = IssueStore::open(
            Arc::new(FakeService::new(Vec::new())),
            snapshots,
            StoreOptions::default(),
        )
        .unwrap();
        assert_eq!(store.snapshot(), BoardState::default());
    }

    // === Polling ===

    fn polling_store() -> (Arc<FakeService>, IssueStore) {
        let service = Arc::new(FakeService::new(sample_issues()).with_latency(Duration::ZERO));
        let store = store_with(&service);
        (service, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_fetches_now_and_every_interval() {
        let (service, store) = polling_store();
        store.start_polling();
        assert!(store.is_polling());

        tokio::time::sleep(ms(1)).await;
        assert_eq!(service.fetch_count(), 1);
        assert_eq!(store.issues().len(), 3);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.fetch_count(), 2);

        store.stop_polling();
        assert!(!store.is_polling());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.fetch_count(), 2);

        // Stopping again is a no-op.
        store.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_does_not_cancel_inflight_fetch() {
        let service = Arc::new(FakeService::new(sample_issues()));
        let store = store_with(&service);
        store.start_polling();
        tokio::time::sleep(ms(1)).await;
        assert!(store.is_loading());

        store.stop_polling();
        tokio::time::sleep(ms(600)).await;
        assert!(!store.is_loading());
        assert_eq!(store.issues().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_keeps_a_single_timer() {
        let (service, store) = polling_store();
        store.start_polling();
        tokio::time::sleep(ms(1)).await;
        store.start_polling();

        tokio::time::sleep(ms(10_100)).await;
        // Two immediate fetches plus one tick.
        assert_eq!(service.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_restarts_at_new_period() {
        let (service, store) = polling_store();
        store.start_polling();
        tokio::time::sleep(ms(10_500)).await;
        assert_eq!(service.fetch_count(), 2);

        store.set_polling_interval(Duration::from_secs(5)).unwrap();
        assert_eq!(store.polling_interval(), Duration::from_secs(5));
        tokio::time::sleep(ms(1)).await;
        assert_eq!(service.fetch_count(), 3);

        // New timer ticks at 15.5s.
        tokio::time::sleep(ms(5000)).await;
        assert_eq!(service.fetch_count(), 4);

        // The old 10s timer would have fired at 20s.
        tokio::time::sleep(ms(4600)).await;
        assert_eq!(service.fetch_count(), 4);

        tokio::time::sleep(ms(500)).await;
        assert_eq!(service.fetch_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_while_idle_does_not_start() {
        let (service, store) = polling_store();
        store.set_polling_interval(Duration::from_secs(30)).unwrap();
        assert!(!store.is_polling());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_interval_out_of_range_is_rejected() {
        let (_, store) = polling_store();
        for secs in [0, 4, 61] {
            let err = store
                .set_polling_interval(Duration::from_secs(secs))
                .unwrap_err();
            assert!(matches!(err, BoardError::InvalidPollingInterval { .. }));
        }
        assert_eq!(store.polling_interval(), DEFAULT_POLLING_INTERVAL);
        assert!(validate_polling_interval(Duration::from_secs(5)).is_ok());
        assert!(validate_polling_interval(Duration::from_secs(60)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_store_ends_polling() {
        let (service, store) = polling_store();
        store.start_polling();
        tokio::time::sleep(ms(1)).await;
        assert_eq!(service.fetch_count(), 1);

        drop(store);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.fetch_count(), 1);
    }
}
