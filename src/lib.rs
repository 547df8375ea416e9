// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::HarnessConfig;
use crate::engine::Orchestrator;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - CLI overrides of the `[config]` section
/// - the orchestrator
/// - Ctrl-C handling (turned into an interrupt of the current wait)
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    apply_overrides(&mut cfg, &args);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Ctrl-C → interrupt. A failed listener just drops the sender, which the
    // orchestrator treats as "never interrupted".
    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = interrupt_tx.send(true);
    });

    let report = Orchestrator::from_config(&cfg)
        .with_interrupt(interrupt_rx)
        .run()
        .await?;

    report.into_result()?;
    info!("all testers passed");
    Ok(())
}

/// CLI flags win over the config file.
fn apply_overrides(cfg: &mut HarnessConfig, args: &CliArgs) {
    if args.no_fail_fast {
        cfg.settings.fail_fast = false;
    }
    if let Some(ms) = args.containers_startup_timeout {
        cfg.settings.containers_startup_timeout = Some(Duration::from_millis(ms));
    }
    if let Some(ms) = args.tests_completion_timeout {
        cfg.settings.tests_completion_timeout = Some(Duration::from_millis(ms));
    }
}

/// Simple dry-run output: print settings and processes.
fn print_dry_run(cfg: &HarnessConfig) {
    let s = &cfg.settings;
    println!("testrig dry-run");
    println!("  config.containers_startup_timeout = {:?}", s.containers_startup_timeout);
    println!("  config.tests_completion_timeout = {:?}", s.tests_completion_timeout);
    println!("  config.fail_fast = {}", s.fail_fast);
    println!();

    println!("containers ({}):", cfg.containers.len());
    for c in &cfg.containers {
        println!("  - {}", c.process_id());
        println!("      command: {}", c.command);
        println!("      working_dir: {}", c.working_dir.display());
        if let Some(w) = c.effective_start_watch() {
            println!("      start_watch: {w}");
        }
        if let Some(ref w) = c.failure_watch {
            println!("      failure_watch: {w}");
        }
    }
    println!();

    println!("testers ({}):", cfg.testers.len());
    for t in &cfg.testers {
        println!("  - {}", t.process_id());
        println!("      command: {}", t.command);
        println!("      working_dir: {}", t.working_dir.display());
        if let Some(d) = t.startup_delay {
            println!("      startup_delay: {d:?}");
        }
        if let Some(d) = t.completion_timeout {
            println!("      completion_timeout: {d:?}");
        }
        if let Some(ref w) = t.watch {
            println!("      watch: {w}");
        }
        if let Some(ref w) = t.failure_watch {
            println!("      failure_watch: {w}");
        }
    }

    debug!("dry-run complete (no process started)");
}
