// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod fs;
pub mod lock;
pub mod logging;
pub mod mode;
pub mod pipeline;
pub mod types;
pub mod watch;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{RunConfiguration, load_and_validate};
use crate::context::AppContext;
use crate::errors::Result;
use crate::mode::{Mode, ModeController, ModeOutcome, install_shutdown_handler};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (fatal before any mode runs)
/// - logging
/// - the process context and the selected mode
pub async fn run(args: CliArgs) -> Result<ModeOutcome> {
    let config = load_and_validate(&args)?;
    logging::init_logging(args.log_level, &config)?;
    run_with_config(args.selected_mode(), config).await
}

/// Run `mode` against an already validated configuration.
///
/// Ctrl-C / SIGTERM cancel the mode; the signal listener is torn down before
/// returning.
pub async fn run_with_config(
    mode: Option<Mode>,
    config: RunConfiguration,
) -> Result<ModeOutcome> {
    info!("Welcome to forrest!");
    debug!(?config, "effective configuration");

    let ctx = AppContext::new(config);
    let shutdown = CancellationToken::new();
    let signals = install_shutdown_handler(shutdown.clone());

    let result = ModeController::new(ctx).run(mode, shutdown.clone()).await;

    shutdown.cancel();
    let _ = signals.await;
    result
}
