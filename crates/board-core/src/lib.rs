//! `board-core` - client-side state for a three-column issue board.
//!
//! Holds the live issue set, filters, undo window and polling timer for one
//! board, talks to an [`IssueService`] for reads and writes, and derives the
//! filtered, priority-sorted columns the presentation layer renders.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use board_core::{IssuePatch, IssueStore, MemorySnapshots, SimulatedIssueService, SimulationConfig, Status};
//!
//! # async fn demo() -> board_core::Result<()> {
//! let snapshots = Arc::new(MemorySnapshots::new());
//! let service = Arc::new(SimulatedIssueService::new(snapshots.clone(), SimulationConfig::default())?);
//! let store = IssueStore::open(service, snapshots, Default::default())?;
//!
//! store.fetch_all().await?;
//!
//! // Visible immediately; rolled back if the service rejects it.
//! let pending = store.update_issue("1", IssuePatch::status(Status::Done))?;
//! pending.wait().await?;
//!
//! // Revert within five seconds.
//! store.undo()?.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod debounce;
pub mod error;
pub mod model;
mod polling;
pub mod query;
pub mod scoring;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use debounce::SearchDebouncer;
pub use error::{BoardError, ErrorKind, Result};
pub use model::{Issue, Priority, SeverityLevel, Status, UndoState};
pub use query::{FilterState, IssuePatch};
pub use scoring::{
    BoardColumns, compute_priority_score, filter_and_sort, sort_by_priority, unique_assignees,
};
pub use service::{IssueService, SimulatedIssueService, SimulationConfig};
pub use snapshot::{MemorySnapshots, PersistedBoard, SnapshotStore};
pub use store::{BoardState, FetchOutcome, IssueStore, Notice, NoticeLevel, PendingUpdate, StoreOptions};
