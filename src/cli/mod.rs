//! Command-line interface for `board`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;
mod session;

use anyhow::Result;
use board_core::{BoardError, Status};
use clap::{Args, Parser, Subcommand};

use crate::config::{CliOverrides, Role};
use crate::logging;

pub use session::{OutputContext, Session};

/// `board` - Terminal issue board.
#[derive(Parser, Debug)]
#[command(name = "board")]
#[command(
    author,
    version,
    about = "Terminal issue board with optimistic updates, undo and live polling",
    long_about = None,
    after_help = "State lives in .board/ (config.yaml, board.db). Run `board init` first."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Act as this user
    #[arg(long, global = true, value_name = "NAME")]
    pub user: Option<String>,

    /// Act with this role
    #[arg(long, global = true, value_enum)]
    pub role: Option<Role>,

    /// Simulated service latency in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// Upper bound of a random extra delay per simulated call, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub jitter_ms: Option<u64>,

    /// Probability (0-1) that the simulated service rejects an update
    #[arg(long, global = true, value_name = "RATE")]
    pub failure_rate: Option<f64>,

    /// The command to run (default: list)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Flag values for the top configuration layer.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let polling_interval_secs = match &self.command {
            Some(Commands::Watch(args)) => args.interval,
            _ => None,
        };
        CliOverrides {
            user: self.user.clone(),
            role: self.role,
            latency_ms: self.latency_ms,
            jitter_ms: self.jitter_ms,
            failure_rate: self.failure_rate,
            polling_interval_secs,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a board workspace in .board/
    Init(InitArgs),

    /// Show the board: three columns, filtered and priority-sorted
    List(ListArgs),

    /// Show issue details and record the visit
    Show(ShowArgs),

    /// Move an issue to another column (admin only)
    Move(MoveArgs),

    /// Set the search query (no text clears it)
    Search(SearchArgs),

    /// Set assignee/severity filters, or print the current filters
    Filter(FilterArgs),

    /// List recently accessed issues
    Recent,

    /// Live board: poll, re-render on change and read commands from stdin
    Watch(WatchArgs),

    /// Print the effective configuration
    Config,

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Re-initialize an existing workspace
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only show this column
    #[arg(long, value_parser = parse_status)]
    pub status: Option<Status>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Issue ID
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Issue ID
    pub id: String,

    /// Target column: backlog, in-progress, done
    #[arg(value_parser = parse_status)]
    pub status: Status,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Search text (matched against title and tags)
    #[arg(trailing_var_arg = true)]
    pub text: Vec<String>,
}

/// Severity filter argument: a level or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityChoice(pub Option<i32>);

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only show issues assigned to NAME ("all" clears)
    #[arg(long, value_name = "NAME")]
    pub assignee: Option<String>,

    /// Only show issues with this severity ("all" clears)
    #[arg(long, value_name = "LEVEL", value_parser = parse_severity_choice)]
    pub severity: Option<SeverityChoice>,

    /// Reset all filters first
    #[arg(long)]
    pub reset: bool,

    /// List the assignees present on the board
    #[arg(long)]
    pub assignees: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Polling interval in seconds (5-60)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[derive(Args, Debug, Clone, Default)]
pub struct VersionArgs {
    /// Print only the version number
    #[arg(long)]
    pub short: bool,
}

/// Parse a column name for clap.
///
/// # Errors
///
/// Returns the `InvalidStatus` message for unknown names.
pub fn parse_status(value: &str) -> std::result::Result<Status, String> {
    value.parse().map_err(|e: BoardError| e.to_string())
}

/// Parse `all` or a severity level for clap.
///
/// # Errors
///
/// Returns a message when the value is neither `all` nor an integer ≥ 1.
pub fn parse_severity_choice(value: &str) -> std::result::Result<SeverityChoice, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("all") || value.is_empty() {
        return Ok(SeverityChoice(None));
    }
    match value.parse::<i32>() {
        Ok(level) if level >= 1 => Ok(SeverityChoice(Some(level))),
        _ => Err(format!("invalid severity '{value}' (expected a level >= 1 or 'all')")),
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub async fn run() -> Result<()> {
    let mut cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    let command = cli
        .command
        .take()
        .unwrap_or_else(|| Commands::List(ListArgs::default()));
    // Keep watch flags visible to the config layers.
    if let Commands::Watch(ref args) = command {
        cli.command = Some(Commands::Watch(args.clone()));
    }
    tracing::debug!(?command, "Dispatching");

    match command {
        Commands::Init(args) => commands::init::execute(&args),
        Commands::List(args) => commands::list::execute(&args, &Session::open(&cli)?).await,
        Commands::Show(args) => commands::show::execute(&args, &Session::open(&cli)?).await,
        Commands::Move(args) => {
            commands::move_issue::execute(&args, &Session::open(&cli)?).await
        }
        Commands::Search(args) => commands::search::execute(&args, &Session::open(&cli)?),
        Commands::Filter(args) => commands::filter::execute(&args, &Session::open(&cli)?).await,
        Commands::Recent => commands::recent::execute(&Session::open(&cli)?).await,
        Commands::Watch(_) => commands::watch::execute(Session::open(&cli)?).await,
        Commands::Config => commands::config::execute(&cli),
        Commands::Completions(args) => {
            commands::completions::execute(args.shell);
            Ok(())
        }
        Commands::Version(args) => commands::version::execute(&args, cli.json),
    }
}
