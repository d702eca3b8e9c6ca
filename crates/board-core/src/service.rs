//! The Issue Service seam and its simulated backend.
//!
//! The store only sees [`IssueService`]. [`SimulatedIssueService`] stands in
//! for a remote system: every call sleeps for a configurable latency and
//! updates fail with a configurable probability. Its issue set lives in a
//! [`SnapshotStore`] record and is re-read on every call, so processes that
//! share the same snapshot store see each other's writes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{BoardError, Result};
use crate::model::Issue;
use crate::query::IssuePatch;
use crate::snapshot::{self, BACKEND_STATE_KEY, SnapshotStore};
use crate::validation::CollectionValidator;

const SEED_ISSUES: &str = include_str!("../data/issues.json");

/// Remote source of truth for issues.
#[async_trait]
pub trait IssueService: Send + Sync {
    /// Return a deep copy of the full issue set.
    async fn fetch_all(&self) -> Result<Vec<Issue>>;

    /// Merge `patch` into the issue `id` and return the merged issue.
    async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Issue>;
}

/// Latency and failure injection for [`SimulatedIssueService`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Base delay before `fetch_all` resolves.
    pub fetch_latency: Duration,
    /// Base delay before `update` resolves.
    pub update_latency: Duration,
    /// Upper bound of a random extra delay added to every call.
    pub jitter: Duration,
    /// Probability in `[0, 1]` that an update is rejected.
    pub failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fetch_latency: Duration::from_millis(500),
            update_latency: Duration::from_millis(500),
            jitter: Duration::ZERO,
            failure_rate: 0.1,
        }
    }
}

impl SimulationConfig {
    /// No latency and no failures.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            fetch_latency: Duration::ZERO,
            update_latency: Duration::ZERO,
            jitter: Duration::ZERO,
            failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BackendState {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    initialized: bool,
}

/// Parse the bundled seed issue set.
///
/// # Errors
///
/// Returns `Json` if the seed file is malformed or `Validation` if it breaks
/// issue invariants.
pub fn seed_issues() -> Result<Vec<Issue>> {
    let issues: Vec<Issue> = serde_json::from_str(SEED_ISSUES)?;
    CollectionValidator::validate(&issues)?;
    Ok(issues)
}

/// In-process stand-in for a remote issue backend.
pub struct SimulatedIssueService {
    snapshots: Arc<dyn SnapshotStore>,
    seed: Vec<Issue>,
    config: SimulationConfig,
    write_lock: Mutex<()>,
}

impl SimulatedIssueService {
    /// Backend seeded from the bundled issue set.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled seed cannot be parsed.
    pub fn new(snapshots: Arc<dyn SnapshotStore>, config: SimulationConfig) -> Result<Self> {
        Ok(Self::with_seed(snapshots, seed_issues()?, config))
    }

    /// Backend seeded from `seed` the first time it is read.
    #[must_use]
    pub fn with_seed(
        snapshots: Arc<dyn SnapshotStore>,
        seed: Vec<Issue>,
        config: SimulationConfig,
    ) -> Self {
        Self {
            snapshots,
            seed,
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn load_or_seed(&self) -> Result<Vec<Issue>> {
        let state: BackendState =
            snapshot::load_json(self.snapshots.as_ref(), BACKEND_STATE_KEY)?.unwrap_or_default();

        if state.initialized && !state.issues.is_empty() {
            return Ok(state.issues);
        }

        tracing::debug!("Seeding simulated backend with {} issues", self.seed.len());
        self.store(self.seed.clone())?;
        Ok(self.seed.clone())
    }

    fn store(&self, issues: Vec<Issue>) -> Result<()> {
        let state = BackendState {
            issues,
            initialized: true,
        };
        snapshot::save_json(self.snapshots.as_ref(), BACKEND_STATE_KEY, &state)
    }

    fn delay(&self, base: Duration) -> Duration {
        let jitter_ms = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    fn should_fail(&self) -> bool {
        let rate = self.config.failure_rate;
        if rate.is_nan() || rate <= 0.0 {
            return false;
        }
        rand::rng().random_bool(rate.min(1.0))
    }
}

#[async_trait]
impl IssueService for SimulatedIssueService {
    async fn fetch_all(&self) -> Result<Vec<Issue>> {
        tokio::time::sleep(self.delay(self.config.fetch_latency)).await;
        self.load_or_seed()
    }

    async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Issue> {
        tokio::time::sleep(self.delay(self.config.update_latency)).await;

        if self.should_fail() {
            tracing::debug!(id, "Simulated backend rejected update");
            return Err(BoardError::Backend("Failed to update issue".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut issues = self.load_or_seed()?;
        let issue = issues
            .iter_mut()
            .find(|issue| issue.id == id)
            .ok_or_else(|| BoardError::IssueNotFound { id: id.to_string() })?;
        patch.apply_to(issue);
        let merged = issue.clone();
        self.store(issues)?;

        Ok(merged)
    }
}
