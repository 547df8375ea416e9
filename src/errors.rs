// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::ProcessId;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// Every problem found while validating the configuration, reported
    /// together so the user can fix them in one go.
    #[error("{} configuration error(s) found: {}", .problems.len(), .problems.join("; "))]
    ConfigError { problems: Vec<String> },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("unable to start {id} process: {source}")]
    SpawnError {
        id: ProcessId,
        #[source]
        source: std::io::Error,
    },

    #[error("failure reported by the following processes: [{}]", join_ids(.failed))]
    RunFailed { failed: Vec<ProcessId> },

    #[error("run interrupted before all processes completed")]
    Interrupted,
}

fn join_ids(ids: &[ProcessId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, HarnessError>;
