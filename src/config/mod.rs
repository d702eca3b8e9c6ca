//! Configuration management for `board`.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - User config (`~/.config/board/config.yaml`)
//! - Workspace config (`.board/config.yaml`)
//! - Environment variables (`BOARD_*`)
//! - Command-line flags

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use board_core::service::SimulationConfig;
use board_core::store::{StoreOptions, validate_polling_interval};
use board_core::{BoardError, Result};
use serde::{Deserialize, Serialize};

pub const BOARD_DIR: &str = ".board";
pub const CONFIG_FILE: &str = "config.yaml";
pub const DB_FILE: &str = "board.db";

pub const ENV_POLL_INTERVAL: &str = "BOARD_POLL_INTERVAL_SECS";
pub const ENV_LATENCY: &str = "BOARD_LATENCY_MS";
pub const ENV_JITTER: &str = "BOARD_JITTER_MS";
pub const ENV_FAILURE_RATE: &str = "BOARD_FAILURE_RATE";
pub const ENV_USER: &str = "BOARD_USER";
pub const ENV_ROLE: &str = "BOARD_ROLE";

/// What the current user may do on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access: move issues and undo.
    #[default]
    Admin,
    /// Read-only access: view and filter.
    Contributor,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contributor => "contributor",
        }
    }

    #[must_use]
    pub const fn can_edit(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Admin => "Full access - can move issues, update status and undo changes",
            Self::Contributor => "Read-only access - can view issues and use filters",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "contributor" => Ok(Self::Contributor),
            other => Err(BoardError::Config(format!(
                "unknown role '{other}' (expected admin or contributor)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub role: Role,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "Alice".to_string(),
            role: Role::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub latency_ms: u64,
    /// Random extra delay of up to this many milliseconds per call.
    pub jitter_ms: u64,
    pub failure_rate: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            latency_ms: 500,
            jitter_ms: 0,
            failure_rate: 0.1,
        }
    }
}

/// Effective configuration after all layers are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub user: UserConfig,
    pub polling_interval_secs: u64,
    pub search_debounce_ms: u64,
    pub simulation: SimulationSettings,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            user: UserConfig::default(),
            polling_interval_secs: 10,
            search_debounce_ms: 300,
            simulation: SimulationSettings::default(),
        }
    }
}

impl BoardConfig {
    #[must_use]
    pub const fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    #[must_use]
    pub fn simulation_config(&self) -> SimulationConfig {
        let latency = Duration::from_millis(self.simulation.latency_ms);
        SimulationConfig {
            fetch_latency: latency,
            update_latency: latency,
            jitter: Duration::from_millis(self.simulation.jitter_ms),
            failure_rate: self.simulation.failure_rate,
        }
    }

    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            polling_interval: self.polling_interval(),
            ..StoreOptions::default()
        }
    }

    /// Check merged values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPollingInterval` or `Config` for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        validate_polling_interval(self.polling_interval())?;
        let rate = self.simulation.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(BoardError::Config(format!(
                "simulation.failure_rate must be between 0 and 1, got {rate}"
            )));
        }
        if self.user.name.trim().is_empty() {
            return Err(BoardError::Config("user.name cannot be empty".into()));
        }
        Ok(())
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(user) = layer.user {
            if let Some(name) = user.name {
                self.user.name = name;
            }
            if let Some(role) = user.role {
                self.user.role = role;
            }
        }
        if let Some(secs) = layer.polling_interval_secs {
            self.polling_interval_secs = secs;
        }
        if let Some(ms) = layer.search_debounce_ms {
            self.search_debounce_ms = ms;
        }
        if let Some(sim) = layer.simulation {
            if let Some(ms) = sim.latency_ms {
                self.simulation.latency_ms = ms;
            }
            if let Some(ms) = sim.jitter_ms {
                self.simulation.jitter_ms = ms;
            }
            if let Some(rate) = sim.failure_rate {
                self.simulation.failure_rate = rate;
            }
        }
    }
}

/// One partially-specified configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub user: Option<UserLayer>,
    pub polling_interval_secs: Option<u64>,
    pub search_debounce_ms: Option<u64>,
    pub simulation: Option<SimulationLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserLayer {
    pub name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationLayer {
    pub latency_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub failure_rate: Option<f64>,
}

/// Flag values that override every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub user: Option<String>,
    pub role: Option<Role>,
    pub latency_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub failure_rate: Option<f64>,
    pub polling_interval_secs: Option<u64>,
}

impl CliOverrides {
    fn as_layer(&self) -> ConfigLayer {
        ConfigLayer {
            user: Some(UserLayer {
                name: self.user.clone(),
                role: self.role,
            }),
            polling_interval_secs: self.polling_interval_secs,
            search_debounce_ms: None,
            simulation: Some(SimulationLayer {
                latency_ms: self.latency_ms,
                jitter_ms: self.jitter_ms,
                failure_rate: self.failure_rate,
            }),
        }
    }
}

/// Read a YAML layer. A missing file is an empty layer.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_layer(path: &Path) -> Result<ConfigLayer> {
    if !path.exists() {
        return Ok(ConfigLayer::default());
    }
    let raw = fs::read_to_string(path)?;
    let only_comments = raw.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if only_comments {
        return Ok(ConfigLayer::default());
    }
    serde_yaml::from_str(&raw)
        .map_err(|e| BoardError::Config(format!("{}: {e}", path.display())))
}

/// Build the environment layer from a variable lookup.
///
/// # Errors
///
/// Returns `Config` if a variable is set but cannot be parsed.
pub fn env_layer(lookup: impl Fn(&str) -> Option<String>) -> Result<ConfigLayer> {
    let mut layer = ConfigLayer::default();

    if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
        layer.polling_interval_secs = Some(parse_env(ENV_POLL_INTERVAL, &raw)?);
    }

    let latency_ms = lookup(ENV_LATENCY)
        .map(|raw| parse_env::<u64>(ENV_LATENCY, &raw))
        .transpose()?;
    let jitter_ms = lookup(ENV_JITTER)
        .map(|raw| parse_env::<u64>(ENV_JITTER, &raw))
        .transpose()?;
    let failure_rate = lookup(ENV_FAILURE_RATE)
        .map(|raw| parse_env::<f64>(ENV_FAILURE_RATE, &raw))
        .transpose()?;
    if latency_ms.is_some() || jitter_ms.is_some() || failure_rate.is_some() {
        layer.simulation = Some(SimulationLayer {
            latency_ms,
            jitter_ms,
            failure_rate,
        });
    }

    let name = lookup(ENV_USER).filter(|v| !v.trim().is_empty());
    let role = lookup(ENV_ROLE).map(|raw| raw.parse::<Role>()).transpose()?;
    if name.is_some() || role.is_some() {
        layer.user = Some(UserLayer { name, role });
    }

    Ok(layer)
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| BoardError::Config(format!("{name}={raw}: {e}")))
}

/// Path of the per-user config file, if a home directory is known.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join("board").join(CONFIG_FILE));
    }
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".config").join("board").join(CONFIG_FILE))
}

/// Merge every layer into the effective configuration.
///
/// # Errors
///
/// Returns `Config` on unreadable layers and validation errors on
/// out-of-range values.
pub fn load_config(board_dir: Option<&Path>, cli: &CliOverrides) -> Result<BoardConfig> {
    let mut config = BoardConfig::default();

    if let Some(path) = user_config_path() {
        config.apply(load_layer(&path)?);
    }
    if let Some(dir) = board_dir {
        config.apply(load_layer(&dir.join(CONFIG_FILE))?);
    }
    config.apply(env_layer(|name| std::env::var(name).ok())?);
    config.apply(cli.as_layer());

    config.validate()?;
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Find `.board/` in `start` or any of its ancestors.
#[must_use]
pub fn discover_board_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(BOARD_DIR))
        .find(|candidate| candidate.is_dir())
}

/// Template written by `board init`.
pub const CONFIG_TEMPLATE: &str = r"# Issue board configuration
# user:
#   name: Alice
#   role: admin          # admin | contributor
# polling_interval_secs: 10   # 5-60
# search_debounce_ms: 300
# simulation:
#   latency_ms: 500
#   jitter_ms: 0      # random extra delay per call
#   failure_rate: 0.1
";
