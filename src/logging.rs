// src/logging.rs

//! Logging setup for `testrig` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TESTRIG_LOG` environment variable, taken as `EnvFilter` directives
//!    (e.g. "debug" or "info,testrig::output=warn")
//! 3. default to `info`
//!
//! Console lines of the spawned processes are logged under their own target
//! ([`OUTPUT_TARGET`]); `--hide-process-output` switches that target off.
//! Everything goes to STDERR.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;
pub use crate::exec::watcher::OUTPUT_TARGET;

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV: &str = "TESTRIG_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, hide_process_output: bool) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref(), hide_process_output);
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter '{directives}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

/// Build the `EnvFilter` directive string for the given inputs.
pub fn filter_directives(
    cli_level: Option<LogLevel>,
    env: Option<&str>,
    hide_process_output: bool,
) -> String {
    let mut directives = match (cli_level, env.map(str::trim)) {
        (Some(lvl), _) => level_name(lvl).to_string(),
        (None, Some(env)) if !env.is_empty() => env.to_string(),
        (None, _) => "info".to_string(),
    };
    if hide_process_output {
        directives.push_str(&format!(",{OUTPUT_TARGET}=off"));
    }
    directives
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
