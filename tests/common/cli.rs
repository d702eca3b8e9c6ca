//! Helpers for running the `board` binary against a throwaway workspace.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitStatus;

use assert_cmd::Command;
use tempfile::TempDir;

/// Variables that would leak the developer's environment into a run.
const SCRUBBED_ENV: &[&str] = &[
    "RUST_LOG",
    "NO_COLOR",
    "XDG_CONFIG_HOME",
    "BOARD_USER",
    "BOARD_ROLE",
    "BOARD_POLL_INTERVAL_SECS",
    "BOARD_JITTER_MS",
];

pub struct BoardWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub home: PathBuf,
}

impl BoardWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().join("project");
        let home = temp_dir.path().join("home");
        std::fs::create_dir_all(&root).expect("create project dir");
        std::fs::create_dir_all(&home).expect("create home dir");
        Self {
            temp_dir,
            root,
            home,
        }
    }

    /// Workspace that has already run `board init`.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        let init = run_board(&workspace, ["init"], "init");
        assert!(init.status.success(), "init failed: {}", init.stderr);
        workspace
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{}", self.stdout))
    }
}

pub fn run_board<I, S>(workspace: &BoardWorkspace, args: I, label: &str) -> RunResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_board_full(workspace, args, &[], "", label)
}

pub fn run_board_with_env<I, S>(
    workspace: &BoardWorkspace,
    args: I,
    env: &[(&str, &str)],
    label: &str,
) -> RunResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_board_full(workspace, args, env, "", label)
}

pub fn run_board_with_stdin<I, S>(
    workspace: &BoardWorkspace,
    args: I,
    stdin: &str,
    label: &str,
) -> RunResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_board_full(workspace, args, &[], stdin, label)
}

fn run_board_full<I, S>(
    workspace: &BoardWorkspace,
    args: I,
    env: &[(&str, &str)],
    stdin: &str,
    label: &str,
) -> RunResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::cargo_bin("board").expect("board binary");
    cmd.current_dir(&workspace.root)
        .args(args)
        .env("HOME", &workspace.home)
        .env("BOARD_LATENCY_MS", "0")
        .env("BOARD_FAILURE_RATE", "0");
    for name in SCRUBBED_ENV {
        cmd.env_remove(name);
    }
    for (name, value) in env {
        cmd.env(name, value);
    }
    cmd.write_stdin(stdin.to_string());

    let output = cmd.output().expect("run board");
    let result = RunResult {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if !result.status.success() {
        eprintln!("[{label}] exit {:?}\n{}", result.status.code(), result.stderr);
    }
    result
}
