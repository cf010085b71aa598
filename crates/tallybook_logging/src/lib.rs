//! Shared logging setup for Tallybook binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "tallybook=info,tallybook_store=info,tallybook_remote=info";

/// Environment variable overriding [`tallybook_home`].
pub const HOME_ENV: &str = "TALLYBOOK_HOME";

pub struct LogConfig<'a> {
    /// Log file prefix, e.g. `tallybook` → `tallybook.log.2024-01-02`
    pub app_name: &'a str,
    /// Show debug output on stderr regardless of `RUST_LOG`
    pub verbose: bool,
    /// Also write a daily-rolling file under [`logs_dir`]
    pub log_to_file: bool,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
/// A log directory that cannot be created disables the file layer with a
/// warning on stderr rather than failing startup.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let env_filter = env_filter(config.verbose);

    let mut guard = None;
    let file_layer = if config.log_to_file {
        match ensure_logs_dir() {
            Ok(dir) => {
                let appender =
                    tracing_appender::rolling::daily(dir, format!("{}.log", config.app_name));
                let (writer, worker_guard) = tracing_appender::non_blocking(appender);
                guard = Some(worker_guard);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_filter(env_filter.clone()),
                )
            }
            Err(err) => {
                eprintln!("Warning: file logging disabled: {:#}", err);
                None
            }
        }
    } else {
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("tallybook=debug,tallybook_store=debug,tallybook_remote=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Tallybook home directory: `~/.tallybook`, or `$TALLYBOOK_HOME`.
pub fn tallybook_home() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(HOME_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".tallybook"))
}

/// `~/.tallybook/logs`
pub fn logs_dir() -> Result<PathBuf> {
    Ok(tallybook_home()?.join("logs"))
}

pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}
