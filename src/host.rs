//! Process bootstrap shared by the tool-host binaries.
//!
//! Parses the (optional) command line, installs tracing on stderr, loads
//! configuration, builds the binary's registry, and runs one stdio session on
//! a current-thread runtime. stdout carries protocol traffic only.

use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::HostConfig;
use crate::registry::ToolRegistry;
use crate::session::{self, SessionEnd, SessionSummary};
use crate::{AppError, Result};

/// Log output format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Command-line arguments. None are required.
#[derive(Debug, Parser)]
#[command(about = "Line-delimited JSON-RPC tool host over stdio", version, long_about = None)]
pub struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log output format (text or json). Logs go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Entry point for a tool-host binary.
///
/// `build` receives the loaded configuration and returns the registry this
/// process serves.
///
/// # Errors
///
/// Returns `AppError::Config` if tracing, configuration, the registry, or the
/// runtime cannot be set up. A session that ends on an I/O failure is logged
/// and still counts as a normal exit.
pub fn run<F>(binary: &'static str, build: F) -> Result<()>
where
    F: FnOnce(&HostConfig) -> Result<ToolRegistry>,
{
    let matches = Cli::command().name(binary).get_matches();
    let args = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    init_tracing(args.log_format)?;
    info!(binary, "tool host bootstrap");

    let mut config = match args.config {
        Some(path) => HostConfig::load_from_path(path)?,
        None => HostConfig::default(),
    };
    config.load_credentials();

    let registry = build(&config)?;
    info!(tools = ?registry, "registry built");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?;
    runtime.block_on(serve_stdio(&registry, &config).instrument(info_span!("session", binary)));

    // A cancelled session can leave a blocking stdin read parked on the pool.
    runtime.shutdown_background();
    Ok(())
}

/// Serve one session over the process's stdin/stdout.
///
/// Ctrl-C or SIGTERM cancels the session between lines.
pub async fn serve_stdio(registry: &ToolRegistry, config: &HostConfig) -> SessionSummary {
    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    let signal_handle = tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_ct.cancel();
    });

    let summary = session::run_session(
        registry,
        &config.session,
        tokio::io::stdin(),
        tokio::io::stdout(),
        ct,
    )
    .await;

    signal_handle.abort();
    if let SessionEnd::IoFailure(ref reason) = summary.end {
        error!(%reason, "stdio session ended on I/O failure");
    }
    session::log_summary(&summary);
    summary
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                if let Err(err) = ctrl_c.await {
                    tracing::error!(%err, "ctrl-c signal handler failed");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
