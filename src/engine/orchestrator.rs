// src/engine/orchestrator.rs

use std::future::pending;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::config::HarnessConfig;
use crate::engine::core::{RunCore, RunReport};
use crate::engine::{RunEvent, RunOptions, SignalGate, WaitOutcome};
use crate::errors::Result;
use crate::exec::{spawn_process, terminate, ProcessHandle, ProcessLaunch};
use crate::types::{ContainerSpec, TesterSpec};

/// Drives one harness run.
///
/// spawn containers → wait for them to be ready → run testers in order →
/// terminate everything still alive → verdict.
///
/// This is the IO shell around [`RunCore`]: it owns the process handles, the
/// event channel fed by the watcher tasks and the optional interrupt signal,
/// and feeds everything it observes into the core.
pub struct Orchestrator {
    pub(super) containers: Vec<ContainerSpec>,
    pub(super) testers: Vec<TesterSpec>,
    pub(super) options: RunOptions,
    pub(super) core: RunCore,
    pub(super) events_tx: mpsc::UnboundedSender<RunEvent>,
    events_rx: mpsc::UnboundedReceiver<RunEvent>,
    pub(super) interrupt: Option<watch::Receiver<bool>>,
    /// Containers in start order.
    pub(super) live_containers: Vec<ProcessHandle>,
    pub(super) current_tester: Option<ProcessHandle>,
}

impl Orchestrator {
    pub fn new(containers: Vec<ContainerSpec>, testers: Vec<TesterSpec>, options: RunOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            core: RunCore::new(options.fail_fast),
            containers,
            testers,
            options,
            events_tx,
            events_rx,
            interrupt: None,
            live_containers: Vec::new(),
            current_tester: None,
        }
    }

    pub fn from_config(cfg: &HarnessConfig) -> Self {
        Self::new(
            cfg.containers.clone(),
            cfg.testers.clone(),
            RunOptions::from(cfg),
        )
    }

    /// Attach an interrupt signal. Flipping it to `true` makes every pending
    /// and future wait return as interrupted.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Execute the run.
    ///
    /// Every spawned process is terminated before this returns, including
    /// when a spawn error aborts the run; that error is returned after the
    /// cleanup. Otherwise the returned report carries the verdict (see
    /// [`RunReport::into_result`]).
    pub async fn run(mut self) -> Result<RunReport> {
        info!(
            containers = self.containers.len(),
            testers = self.testers.len(),
            fail_fast = self.options.fail_fast,
            "starting run"
        );

        let outcome = self.drive().await;
        if let Err(ref e) = outcome {
            error!(error = %e, "run aborted by fatal error");
        }

        self.drain().await;

        let report = self.core.finish();
        info!(
            failed = report.failed,
            failed_ids = ?report.failed_ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "run finished"
        );
        outcome.map(|()| report)
    }

    async fn drive(&mut self) -> Result<()> {
        self.spawn_containers()?;
        self.await_containers().await;

        if self.core.state().failed() {
            error!("containers failed to start; no tester will run");
            return Ok(());
        }

        self.run_testers().await
    }

    fn spawn_containers(&mut self) -> Result<()> {
        for spec in &self.containers {
            let handle = spawn_process(
                ProcessLaunch::from(spec),
                self.events_tx.clone(),
                &self.options.private_environment_variables,
            )?;
            self.core.on_spawned(handle.id());
            self.live_containers.push(handle);
        }
        Ok(())
    }

    /// Termination pass over every process that is still alive.
    async fn drain(&mut self) {
        self.core.sequence_finished();

        for handle in std::mem::take(&mut self.live_containers) {
            self.terminate_handle(handle).await;
        }
        if let Some(handle) = self.current_tester.take() {
            self.terminate_handle(handle).await;
        }

        self.drain_events();
    }

    pub(super) async fn terminate_handle(&mut self, handle: ProcessHandle) {
        let id = terminate(handle).await;
        self.core.on_terminated(&id);
    }

    /// Wait for `gate` until `deadline` (unbounded if `None`), applying
    /// watcher events as they arrive.
    ///
    /// With `stop_on_abort`, the wait also ends as soon as anything aborts
    /// the run. A gate that is already open wins over an expired deadline.
    pub(super) async fn wait_on(
        &mut self,
        gate: SignalGate,
        deadline: Option<Instant>,
        stop_on_abort: bool,
    ) -> WaitOutcome {
        loop {
            if stop_on_abort && self.core.state().abort() {
                return WaitOutcome::Aborted;
            }

            tokio::select! {
                biased;

                _ = gate.released() => return WaitOutcome::Released,

                Some(event) = self.events_rx.recv() => self.core.on_event(&event),

                _ = interrupted(&mut self.interrupt) => {
                    self.core.on_interrupted();
                    return WaitOutcome::Interrupted;
                }

                _ = sleep_until(deadline) => return WaitOutcome::TimedOut,
            }
        }
    }

    /// Apply every event already posted by the watchers.
    pub(super) fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            debug!(?event, "applying pending event");
            self.core.on_event(&event);
        }
    }
}

/// Resolves once the interrupt signal is set; never resolves without one.
pub(super) async fn interrupted(signal: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = signal {
        if rx.wait_for(|set| *set).await.is_ok() {
            return;
        }
    }
    pending::<()>().await
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => pending::<()>().await,
    }
}
