//! Debounced search input.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::store::IssueStore;

/// Quiet window before typed search text is applied.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coalesces rapid search input into one `set_search_query` call.
///
/// Each input cancels the pending one, so only text that stayed unchanged
/// for the whole quiet window reaches the store.
pub struct SearchDebouncer {
    store: IssueStore,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    #[must_use]
    pub fn new(store: IssueStore) -> Self {
        Self::with_delay(store, DEFAULT_SEARCH_DEBOUNCE)
    }

    #[must_use]
    pub fn with_delay(store: IssueStore, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: None,
        }
    }

    /// Schedule `text` to become the search query after the quiet window.
    pub fn input(&mut self, text: impl Into<String>) {
        self.cancel();
        let text = text.into();
        let store = self.store.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(query = %text, "Applying debounced search");
            store.set_search_query(text);
        }));
    }

    /// Drop the pending input, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
