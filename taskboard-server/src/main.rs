//! Taskboard server: a task and user tracking API that keeps
//! `Task.assignedUser` and `User.pendingTasks` consistent.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:4000
//! cargo run --bin taskboard-server
//!
//! # Run on custom address with a faster background sweep
//! cargo run --bin taskboard-server -- --bind 127.0.0.1:8080 --sweep-interval-secs 30
//!
//! # Or via environment variables
//! TASKBOARD_ADDR=127.0.0.1:8080 TASKBOARD_LOG=debug cargo run --bin taskboard-server
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use taskboard::{Board, MemoryStore};
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::server::{self, AppState};
use taskboard_server::sweeper;
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, config.log_file.as_deref());

    tracing::info!(addr = %config.bind_addr, "starting taskboard server");

    let store = Arc::new(MemoryStore::new());
    let board = Board::with_failure_capacity(store, config.failure_log_capacity);
    let state = Arc::new(AppState::with_config(board, config.max_body_size));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_handle = config
        .sweep_interval()
        .map(|every| sweeper::spawn_periodic_sweep(Arc::clone(&state), every, shutdown_rx.clone()));

    let mut server_shutdown = shutdown_rx;
    let shutdown = async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    };

    match server::start_server_with_state(&config.bind_addr, state, shutdown).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskboard server listening");
            let ctrl_c_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                    return;
                }
                tracing::info!("shutdown requested");
                let _ = ctrl_c_tx.send(true);
            });
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "taskboard server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start taskboard server");
            std::process::exit(1);
        }
    }

    // The server may also stop on its own; make sure the sweep follows.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweep_handle
        && let Err(e) = handle.await
    {
        tracing::error!(error = %e, "sweep task failed");
    }
    tracing::info!("taskboard server stopped");
}

/// Initialize logging to stderr, or to `file_path` when given.
///
/// Returns a [`WorkerGuard`] when logging to a file; it must be held until
/// shutdown so buffered entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some((log_dir, file_name)) = file_path.and_then(split_log_path) else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn split_log_path(path: &Path) -> Option<(&Path, &str)> {
    let dir = path.parent()?;
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    Some((dir, path.file_name()?.to_str()?))
}
