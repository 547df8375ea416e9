// src/exec/spawn.rs

//! Spawning container and tester processes.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Level};

use crate::engine::{RunEvent, SignalGate};
use crate::errors::{HarnessError, Result};
use crate::exec::watcher::{spawn_output_watcher, spawn_stderr_drain, OutputWatcher, WatchConfig};
use crate::types::{ContainerSpec, ProcessId, TesterSpec};

/// How long the exit supervisor lets the stdout watcher finish reading after
/// the process exits, before it opens the gate anyway. A grandchild that
/// inherited stdout can keep the pipe open indefinitely.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Everything needed to start one process.
#[derive(Debug, Clone)]
pub struct ProcessLaunch {
    pub id: ProcessId,
    pub command: String,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub watches: WatchConfig,
    /// Open the gate when the process exits on its own. Set for testers,
    /// which may finish without ever printing a watch text.
    pub release_gate_on_exit: bool,
}

impl From<&ContainerSpec> for ProcessLaunch {
    fn from(spec: &ContainerSpec) -> Self {
        Self {
            id: spec.process_id(),
            command: spec.command.clone(),
            working_dir: spec.working_dir.clone(),
            env: spec.env.clone(),
            watches: WatchConfig {
                notify: spec.start_watch.clone(),
                failure: spec.failure_watch.clone(),
            },
            release_gate_on_exit: false,
        }
    }
}

impl From<&TesterSpec> for ProcessLaunch {
    fn from(spec: &TesterSpec) -> Self {
        Self {
            id: spec.process_id(),
            command: spec.command.clone(),
            working_dir: spec.working_dir.clone(),
            env: spec.env.clone(),
            watches: WatchConfig {
                notify: spec.watch.clone(),
                failure: spec.failure_watch.clone(),
            },
            release_gate_on_exit: true,
        }
    }
}

/// A live process plus the tasks attached to it.
///
/// The OS child itself is owned by the exit supervisor task; the handle
/// keeps stdin (for the termination byte), the exit code published by the
/// supervisor and the channel that asks the supervisor to kill the child.
/// [`crate::exec::terminate`] consumes the handle.
#[derive(Debug)]
pub struct ProcessHandle {
    pub(crate) id: ProcessId,
    pub(crate) pid: Option<u32>,
    pub(crate) gate: SignalGate,
    pub(crate) stdin: Option<ChildStdin>,
    pub(crate) exit_rx: watch::Receiver<Option<i32>>,
    pub(crate) kill_tx: Option<oneshot::Sender<()>>,
    pub(crate) supervisor: JoinHandle<()>,
}

impl ProcessHandle {
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn gate(&self) -> &SignalGate {
        &self.gate
    }

    /// Exit code if the process has already exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_rx.borrow()
    }
}

/// Start a process, its stdout watcher, stderr drain and exit supervisor.
pub fn spawn_process(
    launch: ProcessLaunch,
    events: mpsc::UnboundedSender<RunEvent>,
    private_env: &HashSet<String>,
) -> Result<ProcessHandle> {
    let id = launch.id.clone();

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&launch.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&launch.command);
        c
    };

    cmd.current_dir(&launch.working_dir)
        .envs(&launch.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    log_environment(&id, &launch.env, private_env);

    info!(
        process = %id,
        cmd = %launch.command,
        dir = %launch.working_dir.display(),
        "starting process"
    );

    let mut child = cmd.spawn().map_err(|source| HarnessError::SpawnError {
        id: id.clone(),
        source,
    })?;

    let pid = child.id();
    let gate = SignalGate::new();
    let stdin = child.stdin.take();

    let output = child.stdout.take().map(|stdout| {
        let watcher = OutputWatcher::new(id.clone(), launch.watches.clone());
        spawn_output_watcher(watcher, stdout, gate.clone(), events.clone())
    });
    if output.is_none() {
        warn!(process = %id, "no stdout pipe available; watch texts will never match");
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_stderr_drain(id.clone(), stderr);
    }

    let (exit_tx, exit_rx) = watch::channel(None);
    let (kill_tx, kill_rx) = oneshot::channel();
    let release_on_exit = launch.release_gate_on_exit.then(|| gate.clone());

    let supervisor = tokio::spawn(supervise(
        id.clone(),
        child,
        kill_rx,
        exit_tx,
        output,
        release_on_exit,
        events,
    ));

    info!(process = %id, pid = ?pid, "started process");

    Ok(ProcessHandle {
        id,
        pid,
        gate,
        stdin,
        exit_rx,
        kill_tx: Some(kill_tx),
        supervisor,
    })
}

/// Own the child until it exits on its own or a kill is requested.
async fn supervise(
    id: ProcessId,
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<i32>>,
    output: Option<JoinHandle<()>>,
    release_on_exit: Option<SignalGate>,
    events: mpsc::UnboundedSender<RunEvent>,
) {
    tokio::select! {
        status_res = child.wait() => {
            let code = match status_res {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    warn!(process = %id, error = %e, "failed waiting for process exit");
                    -1
                }
            };
            exit_tx.send_replace(Some(code));
            info!(process = %id, exit_code = code, "process exited");

            // Let the watcher post whatever the process printed last before
            // the exit is announced.
            if let Some(output) = output {
                let _ = tokio::time::timeout(OUTPUT_DRAIN_GRACE, output).await;
            }

            let _ = events.send(RunEvent::Exited { id: id.clone(), code });
            if let Some(gate) = release_on_exit {
                gate.release();
            }
        }

        _ = kill_rx => {
            // A dropped sender means the handle was lost without running the
            // termination sequence; kill in that case too.
            if let Err(e) = child.kill().await {
                warn!(process = %id, error = %e, "failed to kill process");
            } else {
                debug!(process = %id, "process killed");
            }
        }
    }
}

fn log_environment(id: &ProcessId, extra: &BTreeMap<String, String>, private: &HashSet<String>) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    let mut env: BTreeMap<String, String> = std::env::vars_os()
        .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
        .collect();
    env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));

    debug!(process = %id, "environment configuration");
    for (key, value) in env.iter().filter(|(k, _)| !private.contains(*k)) {
        debug!(process = %id, "    {key}={value}");
    }
}
