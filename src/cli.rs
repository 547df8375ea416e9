// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `testrig`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testrig",
    version,
    about = "Start container processes, run tester processes against them, and tear everything down.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Testrig.toml")]
    pub config: String,

    /// Keep running the remaining testers after one fails.
    #[arg(long)]
    pub no_fail_fast: bool,

    /// Override `[config].containers_startup_timeout` (milliseconds).
    #[arg(long, value_name = "MS")]
    pub containers_startup_timeout: Option<u64>,

    /// Override `[config].tests_completion_timeout` (milliseconds).
    #[arg(long, value_name = "MS")]
    pub tests_completion_timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TESTRIG_LOG` (filter directives) or `info` will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Leave the console output of containers and testers out of the log.
    #[arg(long)]
    pub hide_process_output: bool,

    /// Parse + validate, print the processes, but don't start any of them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
