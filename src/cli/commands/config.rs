//! Config command implementation.

use anyhow::Result;

use crate::cli::Cli;
use crate::config::{self, BoardConfig};

/// Print the effective configuration.
///
/// Works outside a workspace; the workspace layer is used when one is found.
///
/// # Errors
///
/// Returns an error if a layer cannot be read, validation fails, or
/// serialization fails.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let board_dir = config::discover_board_dir(&cwd);
    let effective = config::load_config(board_dir.as_deref(), &cli.overrides())?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    print!("{}", render(&effective)?);
    match board_dir {
        Some(dir) => println!("# workspace: {}", dir.display()),
        None => println!("# workspace: (none)"),
    }
    Ok(())
}

fn render(config: &BoardConfig) -> Result<String> {
    let mut out = serde_yaml::to_string(config)?;
    out.push_str(&format!("# role: {}\n", config.user.role.description()));
    Ok(out)
}
