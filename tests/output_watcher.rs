// tests/output_watcher.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use testrig::engine::{RunEvent, SignalGate, WatchKind};
use testrig::exec::watcher::{next_line_lossy, spawn_output_watcher};
use testrig::exec::{OutputWatcher, WatchConfig};
use testrig::types::ProcessId;
use testrig_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn watches(notify: Option<&str>, failure: Option<&str>) -> WatchConfig {
    WatchConfig {
        notify: notify.map(str::to_string),
        failure: failure.map(str::to_string),
    }
}

#[test]
fn each_kind_fires_once() {
    let mut watcher = OutputWatcher::new(
        ProcessId::container("db"),
        watches(Some("READY"), Some("FATAL")),
    );

    assert!(watcher.check_line("booting").is_empty());
    assert_eq!(watcher.check_line("server READY on :8080"), vec![WatchKind::Ready]);
    assert!(watcher.check_line("READY again").is_empty());
    // failure text is still reported after readiness
    assert_eq!(watcher.check_line("FATAL: disk full"), vec![WatchKind::Failure]);
    assert!(watcher.check_line("FATAL: again").is_empty());
}

#[test]
fn both_texts_are_checked_on_the_same_line() {
    let mut watcher = OutputWatcher::new(
        ProcessId::tester("t1"),
        watches(Some("DONE"), Some("FAIL")),
    );

    assert_eq!(
        watcher.check_line("DONE with 1 FAIL"),
        vec![WatchKind::Failure, WatchKind::Ready]
    );
}

#[test]
fn empty_or_unset_texts_never_match() {
    let mut unset = OutputWatcher::new(ProcessId::tester("t1"), watches(None, None));
    assert!(unset.check_line("anything at all").is_empty());

    let mut empty = OutputWatcher::new(ProcessId::tester("t1"), watches(Some(""), Some("")));
    assert!(empty.check_line("").is_empty());
    assert!(empty.check_line("anything at all").is_empty());
}

#[tokio::test]
async fn watcher_task_posts_events_then_opens_gate() -> TestResult {
    init_tracing();

    let id = ProcessId::container("db");
    let gate = SignalGate::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let output: &'static [u8] = b"starting\nREADY\nREADY\nFATAL oops\n";
    let watcher = OutputWatcher::new(id.clone(), watches(Some("READY"), Some("FATAL")));
    let handle = spawn_output_watcher(watcher, output, gate.clone(), tx);

    timeout(Duration::from_secs(1), handle).await??;

    assert!(gate.is_released());
    assert_eq!(
        rx.recv().await,
        Some(RunEvent::Watch {
            id: id.clone(),
            kind: WatchKind::Ready
        })
    );
    assert_eq!(
        rx.recv().await,
        Some(RunEvent::Watch {
            id,
            kind: WatchKind::Failure
        })
    );
    // stream closed, sender dropped with the task: no exit event from the watcher
    assert_eq!(rx.recv().await, None);

    Ok(())
}

#[tokio::test]
async fn invalid_utf8_line_does_not_stop_the_watcher() -> TestResult {
    init_tracing();

    let id = ProcessId::container("c1");
    let gate = SignalGate::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let output: &'static [u8] = b"caf\xe9\nREADY\n";
    let watcher = OutputWatcher::new(id.clone(), watches(Some("READY"), None));
    timeout(
        Duration::from_secs(1),
        spawn_output_watcher(watcher, output, gate.clone(), tx),
    )
    .await??;

    assert!(gate.is_released());
    assert_eq!(
        rx.recv().await,
        Some(RunEvent::Watch {
            id,
            kind: WatchKind::Ready
        })
    );

    Ok(())
}

#[tokio::test]
async fn lines_are_decoded_lossily_and_stripped() -> TestResult {
    let mut reader: &'static [u8] = b"caf\xe9\r\nplain\nno newline";
    let mut buf = Vec::new();

    assert_eq!(
        next_line_lossy(&mut reader, &mut buf).await?,
        Some("caf\u{FFFD}".to_string())
    );
    assert_eq!(
        next_line_lossy(&mut reader, &mut buf).await?,
        Some("plain".to_string())
    );
    assert_eq!(
        next_line_lossy(&mut reader, &mut buf).await?,
        Some("no newline".to_string())
    );
    assert_eq!(next_line_lossy(&mut reader, &mut buf).await?, None);

    Ok(())
}

#[tokio::test]
async fn closed_stream_without_match_leaves_gate_shut() -> TestResult {
    init_tracing();

    let gate = SignalGate::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let output: &'static [u8] = b"nothing interesting\n";
    let watcher = OutputWatcher::new(ProcessId::tester("t1"), watches(Some("PASS"), None));
    timeout(
        Duration::from_secs(1),
        spawn_output_watcher(watcher, output, gate.clone(), tx),
    )
    .await??;

    assert!(!gate.is_released());
    assert_eq!(rx.recv().await, None);

    Ok(())
}

#[tokio::test]
async fn gate_opens_once_and_wakes_waiters() -> TestResult {
    init_tracing();

    let gate = SignalGate::new();
    let waiter = {
        let gate = gate.clone();
        tokio::spawn(async move { gate.released().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    assert!(gate.release());
    assert!(!gate.release(), "second release must be a no-op");
    timeout(Duration::from_secs(1), waiter).await??;

    // already open: returns immediately
    timeout(Duration::from_millis(100), gate.released()).await?;
    assert!(gate.is_released());

    Ok(())
}
