// src/engine/sequence.rs

//! Sequential tester execution.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::engine::core::{effective_wait, judge};
use crate::engine::orchestrator::{interrupted, Orchestrator};
use crate::engine::WaitOutcome;
use crate::errors::Result;
use crate::exec::{spawn_process, ProcessHandle, ProcessLaunch};
use crate::types::{ProcessId, TesterSpec};

impl Orchestrator {
    /// Run the testers strictly one after another, in declared order.
    ///
    /// The overall budget starts counting here. Once the run is aborted
    /// (fail-fast, container failure text, interrupt) the remaining testers
    /// are skipped without being marked failed.
    pub(super) async fn run_testers(&mut self) -> Result<()> {
        let overall_deadline = self
            .options
            .tests_completion_timeout
            .map(|budget| Instant::now() + budget);

        let testers = self.testers.clone();
        for (idx, spec) in testers.iter().enumerate() {
            self.drain_events();
            if !self.core.accepting_testers() {
                let skipped: Vec<String> = testers[idx..]
                    .iter()
                    .map(|t| t.process_id().to_string())
                    .collect();
                warn!(?skipped, "run aborted; skipping remaining testers");
                break;
            }

            self.run_tester(spec, overall_deadline).await?;
        }

        self.core.sequence_finished();
        Ok(())
    }

    async fn run_tester(&mut self, spec: &TesterSpec, overall_deadline: Option<Instant>) -> Result<()> {
        let id = spec.process_id();

        if let Some(delay) = spec.startup_delay {
            self.startup_delay(&id, delay).await;
        }

        let handle = spawn_process(
            ProcessLaunch::from(spec),
            self.events_tx.clone(),
            &self.options.private_environment_variables,
        )?;
        self.core.on_spawned(&id);
        let gate = handle.gate().clone();
        self.current_tester = Some(handle);

        info!(process = %id, "waiting for tester to complete");
        let outcome = match effective_wait(spec.completion_timeout, overall_deadline, Instant::now()) {
            Some(wait) => self.wait_on(gate, Some(Instant::now() + wait), false).await,
            None => {
                error!(process = %id, "no timeout available, treating it as an immediate timeout");
                WaitOutcome::TimedOut
            }
        };

        // Failure text posted just before the gate opened is still queued.
        self.drain_events();

        let exit_code = self.current_tester.as_ref().and_then(ProcessHandle::exit_code);
        let verdict = judge(exit_code, outcome, self.core.state().saw_failure_text(&id));
        info!(process = %id, ?outcome, ?exit_code, ?verdict, "tester judged");
        self.core.on_tester_result(&id, verdict);

        if let Some(handle) = self.current_tester.take() {
            self.terminate_handle(handle).await;
        }

        Ok(())
    }

    /// Sleep before spawning a tester. An interrupt cuts the delay short but
    /// is otherwise treated as the delay having elapsed.
    async fn startup_delay(&mut self, id: &ProcessId, delay: Duration) {
        debug!(process = %id, delay_ms = delay.as_millis() as u64, "startup delay");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = interrupted(&mut self.interrupt) => {
                warn!(process = %id, "startup delay interrupted - you may get some timing issues");
            }
        }
    }
}
