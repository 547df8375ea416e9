#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use testrig::config::{ConfigSection, HarnessConfig, RawContainer, RawHarnessConfig, RawMillis, RawTester};
use testrig::engine::RunOptions;
use testrig::types::{ContainerSpec, TesterSpec};

/// Builder for `ContainerSpec` to simplify test setup.
///
/// Commands run through `sh -c` in the current directory.
pub struct ContainerSpecBuilder {
    spec: ContainerSpec,
}

impl ContainerSpecBuilder {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            spec: ContainerSpec {
                id: id.to_string(),
                command: command.to_string(),
                working_dir: PathBuf::from("."),
                start_watch: None,
                failure_watch: None,
                env: BTreeMap::new(),
            },
        }
    }

    pub fn start_watch(mut self, text: &str) -> Self {
        self.spec.start_watch = Some(text.to_string());
        self
    }

    pub fn failure_watch(mut self, text: &str) -> Self {
        self.spec.failure_watch = Some(text.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.working_dir = dir.into();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ContainerSpec {
        self.spec
    }
}

/// Builder for `TesterSpec`.
pub struct TesterSpecBuilder {
    spec: TesterSpec,
}

impl TesterSpecBuilder {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            spec: TesterSpec {
                id: id.to_string(),
                command: command.to_string(),
                working_dir: PathBuf::from("."),
                startup_delay: None,
                completion_timeout: None,
                watch: None,
                failure_watch: None,
                env: BTreeMap::new(),
            },
        }
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.spec.completion_timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn startup_delay_ms(mut self, ms: u64) -> Self {
        self.spec.startup_delay = Some(Duration::from_millis(ms));
        self
    }

    pub fn watch(mut self, text: &str) -> Self {
        self.spec.watch = Some(text.to_string());
        self
    }

    pub fn failure_watch(mut self, text: &str) -> Self {
        self.spec.failure_watch = Some(text.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.working_dir = dir.into();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TesterSpec {
        self.spec
    }
}

/// Builder for `RunOptions`.
#[derive(Default)]
pub struct RunOptionsBuilder {
    options: RunOptions,
}

impl RunOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn startup_timeout_ms(mut self, ms: u64) -> Self {
        self.options.containers_startup_timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn tests_timeout_ms(mut self, ms: u64) -> Self {
        self.options.tests_completion_timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.options.fail_fast = val;
        self
    }

    pub fn build(self) -> RunOptions {
        self.options
    }
}

/// Builder for `RawHarnessConfig`, for exercising validation.
#[derive(Default)]
pub struct RawConfigBuilder {
    config: RawHarnessConfig,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, section: ConfigSection) -> Self {
        self.config.config = section;
        self
    }

    pub fn with_container(mut self, id: &str, command: &str) -> Self {
        self.config.container.push(RawContainer {
            id: Some(id.to_string()),
            command: Some(command.to_string()),
            working_dir: Some(".".to_string()),
            ..RawContainer::default()
        });
        self
    }

    pub fn with_raw_container(mut self, container: RawContainer) -> Self {
        self.config.container.push(container);
        self
    }

    pub fn with_tester(mut self, id: &str, command: &str) -> Self {
        self.config.tester.push(RawTester {
            id: Some(id.to_string()),
            command: Some(command.to_string()),
            working_dir: Some(".".to_string()),
            ..RawTester::default()
        });
        self
    }

    pub fn with_tester_delay(mut self, id: &str, command: &str, delay: RawMillis) -> Self {
        self.config.tester.push(RawTester {
            id: Some(id.to_string()),
            command: Some(command.to_string()),
            working_dir: Some(".".to_string()),
            startup_delay: Some(delay),
            ..RawTester::default()
        });
        self
    }

    pub fn with_raw_tester(mut self, tester: RawTester) -> Self {
        self.config.tester.push(tester);
        self
    }

    pub fn build_raw(self) -> RawHarnessConfig {
        self.config
    }

    pub fn build(self) -> HarnessConfig {
        HarnessConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
