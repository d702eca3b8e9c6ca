//! Per-invocation wiring: workspace discovery, configuration, storage and
//! the issue store, plus the output settings shared by every command.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use board_core::{FetchOutcome, IssueStore, SimulatedIssueService, SnapshotStore};
use indicatif::{ProgressBar, ProgressStyle};

use super::Cli;
use crate::config::{self, BoardConfig, DB_FILE};
use crate::storage::SqliteSnapshots;

/// Fallback when the terminal size is unknown (pipes, CI).
const DEFAULT_WIDTH: usize = 120;

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// How command output is rendered.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    pub json: bool,
    pub colors: bool,
    pub progress: bool,
    pub width: usize,
}

impl OutputContext {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let stdout_tty = std::io::stdout().is_terminal();
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        let width = if stdout_tty {
            crossterm::terminal::size().map_or(DEFAULT_WIDTH, |(cols, _)| usize::from(cols))
        } else {
            DEFAULT_WIDTH
        };
        Self {
            json: cli.json,
            colors: !cli.no_color && !no_color_env && stdout_tty && !cli.json,
            progress: !cli.json && !cli.quiet && std::io::stderr().is_terminal(),
            width,
        }
    }

    /// A spinner on stderr, or a hidden bar when progress output is off.
    #[must_use]
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(SPINNER_TICK);
        bar
    }
}

/// An opened board workspace.
pub struct Session {
    pub board_dir: PathBuf,
    pub config: BoardConfig,
    pub store: IssueStore,
    pub out: OutputContext,
}

impl Session {
    /// Discover `.board/`, merge configuration and open the store.
    ///
    /// # Errors
    ///
    /// Returns an error if no workspace is found, the configuration is
    /// invalid, or the database cannot be opened.
    pub fn open(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let Some(board_dir) = config::discover_board_dir(&cwd) else {
            bail!("Not initialized: run `board init` first");
        };
        let config = config::load_config(Some(&board_dir), &cli.overrides())?;

        let db_path = board_dir.join(DB_FILE);
        tracing::debug!(path = %db_path.display(), "Opening board database");
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(SqliteSnapshots::open(&db_path)?);
        let service = Arc::new(SimulatedIssueService::new(
            Arc::clone(&snapshots),
            config.simulation_config(),
        )?);
        let store = IssueStore::open(service, snapshots, config.store_options())?;

        Ok(Self {
            board_dir,
            config,
            store,
            out: OutputContext::from_cli(cli),
        })
    }

    /// Fail unless the configured role may change issues.
    ///
    /// # Errors
    ///
    /// Returns an error for read-only roles.
    pub fn require_edit(&self) -> Result<()> {
        let user = &self.config.user;
        if !user.role.can_edit() {
            bail!(
                "{} is a {}: {}",
                user.name,
                user.role.as_str(),
                user.role.description()
            );
        }
        Ok(())
    }

    /// Fetch the issue set behind a spinner.
    ///
    /// # Errors
    ///
    /// Returns `FetchFailed` when the service cannot be reached.
    pub async fn fetch(&self) -> Result<FetchOutcome> {
        let spinner = self.out.spinner("Loading issues...");
        let outcome = self.store.fetch_all().await;
        spinner.finish_and_clear();
        Ok(outcome?)
    }
}
