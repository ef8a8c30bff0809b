//! ccache HTTP(S) remote storage helper.
//!
//! Usually started automatically by ccache when a `http-helper` remote
//! storage backend is configured. All configuration arrives through
//! `CRSH_*` environment variables; there is no command line surface.

use std::process::ExitCode;

use crsh::config::Config;
use crsh::server::Server;

const HELP_TEXT: &str = "\
This is a ccache HTTP(S) storage helper, usually started automatically by ccache
when needed. More information here: https://ccache.dev/storage-helpers.html
";

#[tokio::main]
async fn main() -> ExitCode {
    if env_missing("CRSH_IPC_ENDPOINT") || env_missing("CRSH_URL") {
        eprint!("{HELP_TEXT}");
        return ExitCode::FAILURE;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    crsh::logging::init(config.log_file.as_deref());

    tracing::info!("starting");
    tracing::info!(endpoint = %config.ipc_endpoint, "IPC endpoint");
    tracing::info!(url = %config.url, "storage URL");
    tracing::info!(idle_timeout_secs = config.idle_timeout.as_secs(), "idle timeout");

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to create server");
            return ExitCode::FAILURE;
        }
    };

    // External cancellation: Ctrl-C triggers the same graceful shutdown
    // path as the idle timer and the Stop request.
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            shutdown.trigger();
        }
    });

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("shutdown complete");
    ExitCode::SUCCESS
}

/// ccache sets its helper variables to non-empty strings; an empty value is
/// the same as unset.
fn env_missing(name: &str) -> bool {
    std::env::var(name).map(|v| v.is_empty()).unwrap_or(true)
}
