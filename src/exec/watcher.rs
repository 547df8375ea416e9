// src/exec/watcher.rs

//! Console output watching.
//!
//! Every spawned process gets one stdout watcher task that looks for its
//! watch texts, and one stderr task that only forwards lines to the log.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{RunEvent, SignalGate, WatchKind};
use crate::types::{non_empty, ProcessId};

/// Tracing target of the console lines of spawned processes, so they can be
/// filtered separately from the harness's own log.
pub const OUTPUT_TARGET: &str = "testrig::output";

/// Watch texts for one process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchConfig {
    /// Start-watch (containers) or success-watch (testers) text.
    pub notify: Option<String>,
    pub failure: Option<String>,
}

/// Line matcher for one process.
///
/// Both texts are checked on every line; each kind fires at most once, so
/// a container can still report failure text after it reported ready.
#[derive(Debug)]
pub struct OutputWatcher {
    id: ProcessId,
    watches: WatchConfig,
    notified: bool,
    failure_reported: bool,
}

impl OutputWatcher {
    pub fn new(id: ProcessId, watches: WatchConfig) -> Self {
        Self {
            id,
            watches,
            notified: false,
            failure_reported: false,
        }
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Match a single line and return the events that fire for it.
    ///
    /// Empty or unset texts never match.
    pub fn check_line(&mut self, line: &str) -> Vec<WatchKind> {
        let mut fired = Vec::with_capacity(2);

        if !self.failure_reported {
            if let Some(text) = non_empty(self.watches.failure.as_deref()) {
                if line.contains(text) {
                    self.failure_reported = true;
                    fired.push(WatchKind::Failure);
                }
            }
        }

        if !self.notified {
            if let Some(text) = non_empty(self.watches.notify.as_deref()) {
                if line.contains(text) {
                    self.notified = true;
                    fired.push(WatchKind::Ready);
                }
            }
        }

        fired
    }
}

/// Spawn the stdout watcher for a process.
///
/// The event is posted before the gate opens, so the control task always
/// finds it in the channel once it sees the gate open.
pub fn spawn_output_watcher<R>(
    mut watcher: OutputWatcher,
    stream: R,
    gate: SignalGate,
    events: mpsc::UnboundedSender<RunEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        loop {
            let line = match next_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(process = %watcher.id, error = %e, "reading stdout failed");
                    break;
                }
            };
            info!(target: OUTPUT_TARGET, process = %watcher.id, "{}", line);

            for kind in watcher.check_line(&line) {
                debug!(process = %watcher.id, ?kind, "watch text matched");
                let _ = events.send(RunEvent::Watch {
                    id: watcher.id.clone(),
                    kind,
                });
                gate.release();
            }
        }

        debug!(process = %watcher.id, "stdout watcher ended");
    })
}

/// Consume stderr so the pipe never fills up; lines go to the log.
pub fn spawn_stderr_drain<R>(id: ProcessId, stream: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            match next_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => info!(target: OUTPUT_TARGET, process = %id, "stderr: {}", line),
                Ok(None) => break,
                Err(e) => {
                    warn!(process = %id, error = %e, "reading stderr failed");
                    break;
                }
            }
        }
    })
}

/// Read one line, decoding invalid UTF-8 lossily. `Ok(None)` once the stream
/// is closed.
///
/// The trailing `\n` (and a `\r` before it) is stripped. A final line
/// without a newline is still returned.
pub async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}
