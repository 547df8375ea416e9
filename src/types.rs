use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which group a spawned process belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessKind {
    Container,
    Tester,
}

impl ProcessKind {
    pub fn label(self) -> &'static str {
        match self {
            ProcessKind::Container => "CONTAINER",
            ProcessKind::Tester => "TESTER",
        }
    }
}

/// Identity of a spawned process across the whole run.
///
/// Container and tester ids live in separate namespaces, so `server` may be
/// both a container and a tester. Renders as `CONTAINER[server]` or
/// `TESTER[server]`, which is also the form used in the final verdict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId {
    pub kind: ProcessKind,
    pub name: String,
}

impl ProcessId {
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            kind: ProcessKind::Container,
            name: name.into(),
        }
    }

    pub fn tester(name: impl Into<String>) -> Self {
        Self {
            kind: ProcessKind::Tester,
            name: name.into(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind == ProcessKind::Container
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind.label(), self.name)
    }
}

/// A validated long-running service process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub id: String,
    pub command: String,
    pub working_dir: PathBuf,
    /// Text on stdout that marks the container as ready. Unset or empty
    /// means "ready as soon as it is spawned".
    pub start_watch: Option<String>,
    pub failure_watch: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl ContainerSpec {
    pub fn process_id(&self) -> ProcessId {
        ProcessId::container(&self.id)
    }

    /// The start-watch text, if it is one that can actually match.
    pub fn effective_start_watch(&self) -> Option<&str> {
        non_empty(self.start_watch.as_deref())
    }
}

/// A validated short-lived test process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesterSpec {
    pub id: String,
    pub command: String,
    pub working_dir: PathBuf,
    pub startup_delay: Option<Duration>,
    pub completion_timeout: Option<Duration>,
    /// Text on stdout that marks the tester as finished successfully.
    pub watch: Option<String>,
    pub failure_watch: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl TesterSpec {
    pub fn process_id(&self) -> ProcessId {
        ProcessId::tester(&self.id)
    }
}

/// Treat `Some("")` the same as `None` for watch strings.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
