//! Shell snippets for tests that need to observe what a process received.

use std::path::Path;
use std::time::Duration;

/// Shell command that copies the first byte of its stdin, as hex, into
/// `out`, then idles.
///
/// The reader is a background job holding its own copy of stdin, so it
/// outlives a forced kill of the shell. `STARTED` is printed once the
/// reader exists.
pub fn record_first_stdin_byte(out: &Path) -> String {
    format!(
        "exec 3<&0; (head -c1 <&3 | od -An -tx1 > '{}') & echo STARTED; exec sleep 30",
        out.display()
    )
}

/// Poll `out` for up to 3 seconds until the recorded byte shows up.
pub async fn recorded_byte(out: &Path) -> Option<String> {
    for _ in 0..60 {
        if let Ok(contents) = std::fs::read_to_string(out) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    None
}
