// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running container and tester
//! commands, using `tokio::process::Command`, and reporting back to the
//! control task via `RunEvent`s.
//!
//! - [`spawn`] starts a process together with its watcher tasks and returns
//!   a [`ProcessHandle`].
//! - [`watcher`] reads console output and matches watch texts.
//! - [`terminate`] runs the termination sequence (control byte, then kill).

pub mod spawn;
pub mod terminate;
pub mod watcher;

pub use spawn::{spawn_process, ProcessHandle, ProcessLaunch};
pub use terminate::{terminate, TERMINATION_BYTE};
pub use watcher::{OutputWatcher, WatchConfig};
