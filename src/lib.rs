pub mod api;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod frontend;
pub mod terminal;
#[cfg(test)]
mod testing;
pub mod types;

use std::sync::Arc;

use clap::Parser;

pub use crate::api::{HttpStore, RemoteStore};
pub use crate::config::SyncConfig;
pub use crate::controller::SyncController;
pub use crate::error::SyncError;
pub use crate::frontend::{Frontend, NullFrontend};
pub use crate::types::{Document, Note, SaveStatus, SyncState};

/// Entry point of the `stickies-sync` binary.
pub fn run() -> anyhow::Result<()> {
    // Only log WARN and above in production to avoid leaking note content.
    // Logs go to stderr so they don't interleave with the editor's output.
    #[cfg(debug_assertions)]
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    #[cfg(not(debug_assertions))]
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = config::Cli::parse();
    let config = cli.sync_config()?;
    let store = HttpStore::new(&config)?;
    tracing::info!(api = %store.base_url(), "using stickies API");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let controller = SyncController::new(
            Arc::new(store),
            Arc::new(terminal::TerminalFrontend::default()),
            config,
        );
        terminal::run(controller, &cli.path).await
    })
}
