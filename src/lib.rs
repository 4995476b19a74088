//! taskboard - Personal Task Board Library
//!
//! This library provides the core functionality for the taskboard CLI and
//! REST server: a day-based classifier over tasks, backed by a sheet file.
//!
//! # Core Concepts
//!
//! - **Active tasks**: today's workflow, shown in status columns
//! - **Upcoming tasks**: work due later, ordered by date then difficulty
//! - **Sheet store**: a header row plus one row per task, under a file lock
//! - **Board**: optimistic status moves that reload on failure
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskboard.toml`
//! - `error`: Error types and result aliases
//! - `task`: Task record, categories and edit payloads
//! - `schedule`: Active / upcoming classification and ordering
//! - `clock`: Injectable "now"
//! - `store`: Store trait and the in-memory store
//! - `sheet`: Sheet-file store
//! - `board`: Board state and mutations
//! - `server`: REST transport
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output for CLI commands

pub mod board;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod schedule;
pub mod server;
pub mod sheet;
pub mod store;
pub mod task;

pub use error::{Error, Result};
