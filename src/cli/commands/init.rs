use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::InitArgs;
use crate::config::{BOARD_DIR, CONFIG_FILE, CONFIG_TEMPLATE, DB_FILE};
use crate::storage::SqliteSnapshots;

const GITIGNORE: &str = r"# Database
*.db
*.db-shm
*.db-wal
";

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the workspace already exists (without `--force`) or
/// the directory or database cannot be created.
pub fn execute(args: &InitArgs) -> Result<()> {
    init_at(Path::new("."), args.force)?;
    println!("Initialized board workspace in {BOARD_DIR}/");
    Ok(())
}

fn init_at(root: &Path, force: bool) -> Result<()> {
    let board_dir = root.join(BOARD_DIR);
    let db_path = board_dir.join(DB_FILE);

    if board_dir.exists() {
        if db_path.exists() && !force {
            bail!(
                "Already initialized at {} (use --force to re-initialize)",
                db_path.display()
            );
        }
    } else {
        fs::create_dir(&board_dir)
            .with_context(|| format!("Failed to create {}", board_dir.display()))?;
    }

    // Creates the file and applies the schema.
    let _snapshots = SqliteSnapshots::open(&db_path)?;

    let config_path = board_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, CONFIG_TEMPLATE)?;
    }

    let gitignore_path = board_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE)?;
    }

    tracing::info!(path = %board_dir.display(), force, "Initialized workspace");
    Ok(())
}
