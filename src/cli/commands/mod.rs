//! Command implementations. Each module exposes an `execute` function.

pub mod completions;
pub mod config;
pub mod filter;
pub mod init;
pub mod list;
pub mod move_issue;
pub mod recent;
pub mod search;
pub mod show;
pub mod version;
pub mod watch;
