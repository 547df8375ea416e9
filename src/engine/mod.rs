// src/engine/mod.rs

//! Orchestration engine for testrig.
//!
//! This module ties together:
//! - container start-up coordination (all containers ready, shared deadline)
//! - the sequential tester run (per-test and overall budgets, fail-fast)
//! - guaranteed termination of every spawned process
//!
//! The pure run state machine lives in [`core`]; the async/IO shell that
//! spawns processes and waits on gates is [`orchestrator`], with the two
//! phases split into [`startup`] and [`sequence`].

use std::collections::HashSet;
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::types::ProcessId;

/// What a watcher saw on a process's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// The start-watch (container) or success-watch (tester) text.
    Ready,
    /// The failure-watch text.
    Failure,
}

/// Events flowing from watcher tasks to the control task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Watch { id: ProcessId, kind: WatchKind },
    /// The process exited on its own. `code` is `-1` for signal deaths.
    Exited { id: ProcessId, code: i32 },
}

/// How a wait on a gate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Released,
    TimedOut,
    /// Operator interrupt; always handled like a timeout.
    Interrupted,
    /// Another process aborted the run while we were waiting.
    Aborted,
}

impl WaitOutcome {
    /// Interrupted waits are treated as "did not complete".
    pub fn timed_out(self) -> bool {
        matches!(self, WaitOutcome::TimedOut | WaitOutcome::Interrupted)
    }
}

/// Global scalars supplied alongside the process specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub containers_startup_timeout: Option<Duration>,
    /// Overall budget shared by the whole tester sequence.
    pub tests_completion_timeout: Option<Duration>,
    pub fail_fast: bool,
    /// Names left out of the per-process environment dump.
    pub private_environment_variables: HashSet<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            containers_startup_timeout: None,
            tests_completion_timeout: None,
            fail_fast: true,
            private_environment_variables: HashSet::new(),
        }
    }
}

impl From<&HarnessConfig> for RunOptions {
    fn from(cfg: &HarnessConfig) -> Self {
        let s = &cfg.settings;
        Self {
            containers_startup_timeout: s.containers_startup_timeout,
            tests_completion_timeout: s.tests_completion_timeout,
            fail_fast: s.fail_fast,
            private_environment_variables: s.private_environment_variables.clone(),
        }
    }
}

pub mod core;
pub mod gate;
pub mod orchestrator;
mod sequence;
mod startup;

pub use self::core::{effective_wait, judge, RunCore, RunPhase, RunReport, RunState, TesterVerdict};
pub use gate::SignalGate;
pub use orchestrator::Orchestrator;
