// tests/terminate.rs
//
// The termination sequence on real `sh` processes.

#![cfg(unix)]

use std::collections::HashSet;
use std::error::Error;

use tokio::sync::mpsc;

use testrig::exec::{spawn_process, terminate, ProcessLaunch};
use testrig::types::ProcessId;
use testrig_test_utils::builders::ContainerSpecBuilder;
use testrig_test_utils::shell::{record_first_stdin_byte, recorded_byte};
use testrig_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn control_byte_reaches_stdin_before_the_kill() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("byte");
    let spec = ContainerSpecBuilder::new("c1", &record_first_stdin_byte(&out))
        .start_watch("STARTED")
        .build();

    let (tx, _rx) = mpsc::unbounded_channel();
    let handle = spawn_process(ProcessLaunch::from(&spec), tx, &HashSet::new())?;
    let pid = handle.pid().ok_or("no pid for spawned process")?;

    with_timeout(handle.gate().released()).await;
    let id = with_timeout(terminate(handle)).await;

    assert_eq!(id, ProcessId::container("c1"));
    assert_eq!(recorded_byte(&out).await.as_deref(), Some("03"));

    let alive = std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()?
        .success();
    assert!(!alive, "process {pid} survived termination");

    Ok(())
}

#[tokio::test]
async fn terminating_an_exited_process_is_harmless() -> TestResult {
    init_tracing();

    let spec = ContainerSpecBuilder::new("c1", "exit 0").build();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = spawn_process(ProcessLaunch::from(&spec), tx, &HashSet::new())?;

    // wait for the exit to be announced
    while let Some(event) = with_timeout(rx.recv()).await {
        if matches!(event, testrig::engine::RunEvent::Exited { .. }) {
            break;
        }
    }
    assert_eq!(handle.exit_code(), Some(0));

    let id = with_timeout(terminate(handle)).await;
    assert_eq!(id, ProcessId::container("c1"));

    Ok(())
}
