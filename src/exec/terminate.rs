// src/exec/terminate.rs

//! Uniform two-step shutdown for every spawned process.

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::exec::spawn::ProcessHandle;
use crate::types::ProcessId;

/// Control byte written to stdin before the forced kill (CTRL-C).
pub const TERMINATION_BYTE: u8 = 0x03;

/// Run the termination sequence on a process and return its id.
///
/// 1. write [`TERMINATION_BYTE`] to stdin and flush, ignoring errors (the
///    process may already have closed its input or exited);
/// 2. kill the process and wait until it is reaped.
///
/// Consumes the handle, so a process cannot be terminated twice.
pub async fn terminate(mut handle: ProcessHandle) -> ProcessId {
    warn!(process = %handle.id, pid = ?handle.pid, "terminating process");

    if let Some(mut stdin) = handle.stdin.take() {
        if let Err(e) = stdin.write_all(&[TERMINATION_BYTE]).await {
            debug!(process = %handle.id, error = %e, "could not write termination byte");
        }
        let _ = stdin.flush().await;
    }

    if let Some(kill) = handle.kill_tx.take() {
        if kill.send(()).is_err() {
            debug!(process = %handle.id, "process had already exited");
        }
    }

    if let Err(e) = (&mut handle.supervisor).await {
        warn!(process = %handle.id, error = %e, "exit supervisor task failed");
    }

    handle.id
}
