//! Command-line interface for taskboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::clock::{Clock, SystemClock};
use crate::config::{resolve_data_dir, Config, DATA_DIR_ENV, PORT_ENV};
use crate::error::Result;
use crate::output::OutputOptions;
use crate::sheet::SheetStore;

mod board;
mod serve;
mod task;

/// taskboard - Personal Task Board
///
/// Tracks tasks in a sheet file, shows today's workflow by status and the
/// upcoming list by due date, and serves the same data over REST.
#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the sheet and taskboard.toml
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data: Option<PathBuf>,

    /// Config file (defaults to <data>/taskboard.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the REST server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show today's workflow and the upcoming list
    Board {
        /// Evaluate as of this day (YYYY-MM-DD) instead of now
        #[arg(long)]
        today: Option<String>,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task name
        name: String,

        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,

        /// Domain: DSA, Development, Basic Task, Ofc Work
        #[arg(long)]
        domain: Option<String>,

        /// Difficulty: Easy, Medium, Hard
        #[arg(long)]
        difficulty: Option<String>,

        /// Due date (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long)]
        due: Option<String>,
    },

    /// List every task in sheet order
    List,

    /// Change fields of a task; blank values are ignored
    Edit {
        /// Task ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        difficulty: Option<String>,

        #[arg(long)]
        due: Option<String>,

        /// Status: Not Started, In Progress, Completed
        #[arg(long)]
        status: Option<String>,
    },

    /// Move a task to another status column
    Move {
        /// Task ID
        id: String,

        /// Status: Not Started, In Progress, Completed
        status: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },
}

/// Resolved config and store shared by every command.
pub struct Context {
    pub config: Config,
    pub store: Arc<SheetStore>,
    pub clock: Arc<dyn Clock>,
    pub output: OutputOptions,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.dispatch())
    }

    async fn dispatch(self) -> Result<()> {
        let ctx = self.load_context()?;
        match self.command {
            Commands::Serve { bind, port } => serve::run(ctx, serve::ServeOptions { bind, port }).await,
            Commands::Board { today } => board::run(ctx, board::BoardOptions { today }).await,
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    name,
                    description,
                    domain,
                    difficulty,
                    due,
                } => {
                    task::run_add(
                        ctx,
                        task::AddOptions {
                            name,
                            description,
                            domain,
                            difficulty,
                            due,
                        },
                    )
                    .await
                }
                TaskCommands::List => task::run_list(ctx).await,
                TaskCommands::Edit {
                    id,
                    name,
                    description,
                    domain,
                    difficulty,
                    due,
                    status,
                } => {
                    task::run_edit(
                        ctx,
                        task::EditOptions {
                            id,
                            name,
                            description,
                            domain,
                            difficulty,
                            due,
                            status,
                        },
                    )
                    .await
                }
                TaskCommands::Move { id, status } => {
                    task::run_move(ctx, task::MoveOptions { id, status }).await
                }
                TaskCommands::Rm { id } => task::run_rm(ctx, task::RmOptions { id }).await,
            },
        }
    }

    fn load_context(&self) -> Result<Context> {
        let data_dir = resolve_data_dir(self.data.clone());
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_from_dir(&data_dir)?,
        };
        config.apply_env(std::env::var(PORT_ENV).ok().as_deref())?;

        std::fs::create_dir_all(&data_dir)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(SheetStore::new(
            config.sheet_path(&data_dir),
            config.store.lock_timeout_ms,
            clock.clone(),
        ));
        tracing::debug!(data_dir = %data_dir.display(), sheet = %store.path().display(), "context loaded");

        Ok(Context {
            config,
            store,
            clock,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        })
    }
}
