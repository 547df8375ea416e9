// src/engine/core.rs

//! Pure run state machine.
//!
//! [`RunCore`] owns the shared run state (failed / abort flags, the ordered
//! set of failed ids) and the current [`RunPhase`]. It is fed by the control
//! task only: watcher tasks never touch it directly, they post
//! [`RunEvent`]s which the control task applies here.
//!
//! It has **no** channels, no processes and no clocks, so the phase
//! transitions, the deadline arithmetic ([`effective_wait`]) and the tester
//! judgment ([`judge`]) can be tested without Tokio.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::{RunEvent, WaitOutcome, WatchKind};
use crate::errors::{HarnessError, Result};
use crate::types::ProcessId;

/// Phases of a run.
///
/// ```text
/// AwaitingContainers --all ready--> RunningTests --sequence done--> Draining --> Done
///         |                              |                             ^
///         +--container timeout/failure---+--fail-fast / container fail-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    AwaitingContainers,
    RunningTests,
    Draining,
    Done,
}

/// Flags and failure bookkeeping shared by every phase of a run.
#[derive(Debug, Default, Clone)]
pub struct RunState {
    failed: bool,
    abort: bool,
    interrupted: bool,
    failed_ids: Vec<ProcessId>,
    failure_text: HashSet<ProcessId>,
}

impl RunState {
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Set once no further tester may be started.
    pub fn abort(&self) -> bool {
        self.abort
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Failed ids in the order they were first recorded.
    pub fn failed_ids(&self) -> &[ProcessId] {
        &self.failed_ids
    }

    pub fn saw_failure_text(&self, id: &ProcessId) -> bool {
        self.failure_text.contains(id)
    }

    fn record_failure(&mut self, id: &ProcessId) {
        self.failed = true;
        if !self.failed_ids.contains(id) {
            self.failed_ids.push(id.clone());
        }
    }
}

/// Why a tester passed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TesterVerdict {
    Passed,
    TimedOut,
    ExitedNonZero(i32),
    FailureText,
}

impl TesterVerdict {
    pub fn passed(self) -> bool {
        self == TesterVerdict::Passed
    }
}

/// Judge a tester once its wait has returned.
///
/// - failure text seen on its output always fails it;
/// - if it has exited, a non-zero exit code fails it;
/// - a timed out (or interrupted) wait fails it, even when the process
///   happened to exit cleanly right at the deadline;
/// - otherwise it passed: either it exited with 0, or its success text
///   arrived and the process simply has not exited yet.
pub fn judge(exit_code: Option<i32>, wait: WaitOutcome, failure_text: bool) -> TesterVerdict {
    if failure_text {
        return TesterVerdict::FailureText;
    }
    match exit_code {
        Some(code) if code != 0 => TesterVerdict::ExitedNonZero(code),
        _ if wait.timed_out() => TesterVerdict::TimedOut,
        _ => TesterVerdict::Passed,
    }
}

/// How long the control task may wait for the current tester.
///
/// The larger of the tester's own completion timeout and whatever is left
/// of the overall budget. `None` means neither exists, which is treated as
/// an immediate timeout rather than an unbounded wait.
pub fn effective_wait(
    own_timeout: Option<Duration>,
    overall_deadline: Option<Instant>,
    now: Instant,
) -> Option<Duration> {
    let remaining = overall_deadline.map(|deadline| deadline.saturating_duration_since(now));
    match (own_timeout, remaining) {
        (Some(own), Some(rest)) => Some(own.max(rest)),
        (own, None) => own,
        (None, rest) => rest,
    }
}

/// Pure run state machine.
#[derive(Debug)]
pub struct RunCore {
    phase: RunPhase,
    state: RunState,
    fail_fast: bool,
    spawned: Vec<ProcessId>,
    live: HashSet<ProcessId>,
    terminated: Vec<ProcessId>,
}

impl RunCore {
    pub fn new(fail_fast: bool) -> Self {
        Self {
            phase: RunPhase::AwaitingContainers,
            state: RunState::default(),
            fail_fast,
            spawned: Vec::new(),
            live: HashSet::new(),
            terminated: Vec::new(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Whether the tester sequence may start another tester.
    pub fn accepting_testers(&self) -> bool {
        self.phase == RunPhase::RunningTests && !self.state.abort
    }

    pub fn is_live(&self, id: &ProcessId) -> bool {
        self.live.contains(id)
    }

    pub fn on_spawned(&mut self, id: &ProcessId) {
        self.spawned.push(id.clone());
        self.live.insert(id.clone());
    }

    /// Record that the termination sequence ran for `id`.
    pub fn on_terminated(&mut self, id: &ProcessId) {
        if !self.live.remove(id) {
            warn!(process = %id, "terminated a process that was not tracked as live");
        }
        self.terminated.push(id.clone());
    }

    /// Apply an event posted by a watcher task.
    pub fn on_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Watch {
                id,
                kind: WatchKind::Ready,
            } => {
                debug!(process = %id, "watch text arrived");
            }
            RunEvent::Watch {
                id,
                kind: WatchKind::Failure,
            } => self.on_failure_text(id),
            RunEvent::Exited { id, code } if id.is_container() && self.live.contains(id) => {
                warn!(process = %id, exit_code = code, "container process exited on its own");
            }
            RunEvent::Exited { id, code } => {
                debug!(process = %id, exit_code = code, "process exited");
            }
        }
    }

    fn on_failure_text(&mut self, id: &ProcessId) {
        if !self.live.contains(id) {
            // Late line from a process that was already judged and stopped.
            debug!(process = %id, "ignoring failure text from a terminated process");
            return;
        }
        warn!(process = %id, "failure text arrived");
        self.state.failure_text.insert(id.clone());
        self.state.record_failure(id);
        if id.is_container() || self.fail_fast {
            self.set_abort();
        }
    }

    /// A container did not report ready within the remaining budget.
    pub fn on_container_timeout(&mut self, id: &ProcessId) {
        warn!(process = %id, "container did not become ready in time");
        self.state.record_failure(id);
        self.set_abort();
    }

    /// Every container that is waited on has reported ready.
    pub fn containers_ready(&mut self) {
        if self.phase != RunPhase::AwaitingContainers {
            return;
        }
        if self.state.failed || self.state.abort {
            self.phase = RunPhase::Draining;
        } else {
            info!("all containers ready");
            self.phase = RunPhase::RunningTests;
        }
    }

    pub fn on_tester_result(&mut self, id: &ProcessId, verdict: TesterVerdict) {
        if verdict.passed() {
            info!(process = %id, "tester passed");
            return;
        }
        warn!(process = %id, ?verdict, "tester failed");
        self.state.record_failure(id);
        if self.fail_fast {
            self.set_abort();
        }
    }

    /// Operator interrupt: stop starting anything new and fail the run.
    pub fn on_interrupted(&mut self) {
        if !self.state.interrupted {
            warn!("run interrupted");
        }
        self.state.interrupted = true;
        self.state.failed = true;
        self.set_abort();
    }

    /// The tester sequence ran out of testers (or was aborted).
    pub fn sequence_finished(&mut self) {
        if matches!(
            self.phase,
            RunPhase::AwaitingContainers | RunPhase::RunningTests
        ) {
            self.phase = RunPhase::Draining;
        }
    }

    fn set_abort(&mut self) {
        if !self.state.abort {
            info!("aborting: no further testers will be started");
        }
        self.state.abort = true;
        if matches!(
            self.phase,
            RunPhase::AwaitingContainers | RunPhase::RunningTests
        ) {
            self.phase = RunPhase::Draining;
        }
    }

    /// Close the run once the termination pass is over.
    pub fn finish(mut self) -> RunReport {
        self.sequence_finished();
        if !self.live.is_empty() {
            warn!(remaining = self.live.len(), "run finished with processes still tracked as live");
        }
        self.phase = RunPhase::Done;
        RunReport {
            failed: self.state.failed,
            failed_ids: self.state.failed_ids,
            interrupted: self.state.interrupted,
            spawned: self.spawned,
            terminated: self.terminated,
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub failed: bool,
    pub failed_ids: Vec<ProcessId>,
    pub interrupted: bool,
    /// Every process spawned, in spawn order.
    pub spawned: Vec<ProcessId>,
    /// Every process the termination sequence ran on, in order.
    pub terminated: Vec<ProcessId>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        !self.failed
    }

    /// Turn the report into the run's final verdict.
    pub fn into_result(self) -> Result<RunReport> {
        if !self.failed {
            Ok(self)
        } else if !self.failed_ids.is_empty() {
            Err(HarnessError::RunFailed {
                failed: self.failed_ids,
            })
        } else {
            Err(HarnessError::Interrupted)
        }
    }
}
