// src/engine/startup.rs

//! Container start-up coordination.

use std::time::Instant;

use tracing::{debug, info};

use crate::engine::orchestrator::Orchestrator;
use crate::engine::WaitOutcome;

impl Orchestrator {
    /// Wait for every container that has a start-watch text to print it.
    ///
    /// With a startup timeout, one deadline is fixed before the first wait
    /// and shared by all containers, so a slow container eats into the time
    /// left for the ones after it. The first container that misses the
    /// deadline fails the run and ends the phase. Containers without a
    /// start-watch text are ready as soon as they are spawned.
    pub(super) async fn await_containers(&mut self) {
        let deadline = self
            .options
            .containers_startup_timeout
            .map(|timeout| Instant::now() + timeout);

        let waits: Vec<_> = self
            .containers
            .iter()
            .zip(self.live_containers.iter())
            .filter_map(|(spec, handle)| {
                spec.effective_start_watch()
                    .map(|text| (handle.id().clone(), handle.gate().clone(), text.to_string()))
            })
            .collect();

        for (id, gate, text) in waits {
            info!(process = %id, watch = %text, "waiting for start text");

            match self.wait_on(gate, deadline, true).await {
                WaitOutcome::Released => debug!(process = %id, "start wait released"),
                WaitOutcome::TimedOut | WaitOutcome::Interrupted => {
                    self.core.on_container_timeout(&id);
                    break;
                }
                WaitOutcome::Aborted => break,
            }

            if self.core.state().abort() {
                break;
            }
        }

        self.drain_events();
        self.core.containers_ready();
    }
}
