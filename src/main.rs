//! taskboard - Personal Task Board CLI
//!
//! Serves the task REST API and manages tasks in the sheet from the shell.

use clap::Parser;
use taskboard::cli::{Cli, Commands};
use taskboard::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the server logs at info and commands stay quiet.
    // Ignore invalid/huge filters so startup never fails on them.
    let default_filter = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "off"
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
