use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ContainerSpec, TesterSpec};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// containers_startup_timeout = 30000
/// tests_completion_timeout = 600000
/// fail_fast = true
///
/// [[container]]
/// id = "server"
/// command = "./run-server.sh"
/// working_dir = "."
/// start_watch = "READY"
///
/// [[tester]]
/// id = "smoke"
/// command = "./smoke.sh"
/// working_dir = "tests"
/// completion_timeout = 2000
/// watch = "PASS"
/// ```
///
/// Containers and testers are arrays of tables so that declaration order is
/// preserved; testers run in exactly that order.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHarnessConfig {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub container: Vec<RawContainer>,

    #[serde(default)]
    pub tester: Vec<RawTester>,
}

/// A millisecond value as written by the user.
///
/// Both `2000` and `"2000"` are accepted; anything that is not a
/// non-negative integer is reported by validation rather than by serde, so
/// that it is counted together with every other configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawMillis {
    Number(i64),
    Text(String),
}

impl RawMillis {
    pub fn to_duration(&self) -> Result<Duration, String> {
        match self {
            RawMillis::Number(n) if *n >= 0 => Ok(Duration::from_millis(*n as u64)),
            RawMillis::Number(n) => Err(format!("expected a non-negative number, not '{n}'")),
            RawMillis::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| format!("expected a number, not '{s}'")),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Max time (ms) for all containers to report ready.
    #[serde(default)]
    pub containers_startup_timeout: Option<RawMillis>,

    /// Overall budget (ms) shared by the whole tester sequence.
    #[serde(default)]
    pub tests_completion_timeout: Option<RawMillis>,

    /// Abort remaining testers as soon as one fails.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,

    /// Environment variable names never written to the log.
    #[serde(default)]
    pub private_environment_variables: Vec<String>,
}

fn default_fail_fast() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            containers_startup_timeout: None,
            tests_completion_timeout: None,
            fail_fast: default_fail_fast(),
            private_environment_variables: Vec::new(),
        }
    }
}

/// `[[container]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawContainer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub start_watch: Option<String>,
    #[serde(default)]
    pub failure_watch: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[[tester]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTester {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub startup_delay: Option<RawMillis>,
    #[serde(default)]
    pub completion_timeout: Option<RawMillis>,
    #[serde(default)]
    pub watch: Option<String>,
    #[serde(default)]
    pub failure_watch: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Global run settings after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub containers_startup_timeout: Option<Duration>,
    pub tests_completion_timeout: Option<Duration>,
    pub fail_fast: bool,
    pub private_environment_variables: HashSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            containers_startup_timeout: None,
            tests_completion_timeout: None,
            fail_fast: true,
            private_environment_variables: HashSet::new(),
        }
    }
}

/// Validated configuration: unique ids, every required field present and
/// every timing value numeric.
///
/// Only constructible through `TryFrom<RawHarnessConfig>` (see
/// `config::validate`), so holding one means the engine can run it.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub settings: Settings,
    pub containers: Vec<ContainerSpec>,
    pub testers: Vec<TesterSpec>,
}

impl HarnessConfig {
    pub(crate) fn new_unchecked(
        settings: Settings,
        containers: Vec<ContainerSpec>,
        testers: Vec<TesterSpec>,
    ) -> Self {
        Self {
            settings,
            containers,
            testers,
        }
    }
}
