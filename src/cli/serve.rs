//! taskboard serve command implementation
//!
//! Runs the REST server over the sheet store until Ctrl-C.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::server::{self, AppState};

use super::Context;

/// Options for the serve command
pub struct ServeOptions {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

pub async fn run(ctx: Context, options: ServeOptions) -> Result<()> {
    let server_config = ServerConfig {
        bind: options.bind.unwrap_or(ctx.config.server.bind),
        port: options.port.unwrap_or(ctx.config.server.port),
    };

    // A broken sheet is reported per request; it does not stop startup.
    match ctx.store.describe().await {
        Ok(info) => tracing::info!(
            sheet = %info.path.display(),
            title = %info.title,
            rows = info.rows,
            "sheet ready"
        ),
        Err(err) => tracing::error!(error = %err, "sheet check failed"),
    }

    let state = AppState::new(ctx.store, ctx.clock);
    server::serve(&server_config, state).await
}
