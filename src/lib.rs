//! `issue_board` - Terminal front end for the issue board core
//!
//! This crate provides the `board` CLI on top of [`board_core`]: workspace
//! discovery, layered configuration, `SQLite` snapshot storage and terminal
//! rendering.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Layered YAML/env/flag configuration
//! - [`storage`] - `SQLite` key-value snapshot store
//! - [`format`] - Output formatting (text, JSON)
//! - [`logging`] - `tracing` subscriber setup

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod format;
pub mod logging;
pub mod storage;

pub use cli::run;
