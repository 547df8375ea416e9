use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{error, warn};

use crate::config::model::{
    ConfigSection, HarnessConfig, RawContainer, RawHarnessConfig, RawMillis, RawTester, Settings,
};
use crate::errors::HarnessError;
use crate::types::{ContainerSpec, TesterSpec};

impl TryFrom<RawHarnessConfig> for HarnessConfig {
    type Error = HarnessError;

    fn try_from(raw: RawHarnessConfig) -> std::result::Result<Self, Self::Error> {
        let mut problems = Problems::default();

        let settings = validate_settings(&raw.config, &mut problems);
        let containers = validate_containers(&raw.container, &mut problems);
        let testers = validate_testers(&raw.tester, &mut problems);

        if !problems.0.is_empty() {
            return Err(HarnessError::ConfigError {
                problems: problems.0,
            });
        }

        Ok(HarnessConfig::new_unchecked(settings, containers, testers))
    }
}

/// Collects every problem so they can be reported together.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, msg: String) {
        error!("{msg}");
        self.0.push(msg);
    }
}

fn validate_settings(cfg: &ConfigSection, problems: &mut Problems) -> Settings {
    Settings {
        containers_startup_timeout: millis(
            cfg.containers_startup_timeout.as_ref(),
            "[config].containers_startup_timeout",
            problems,
        ),
        tests_completion_timeout: millis(
            cfg.tests_completion_timeout.as_ref(),
            "[config].tests_completion_timeout",
            problems,
        ),
        fail_fast: cfg.fail_fast,
        private_environment_variables: cfg.private_environment_variables.iter().cloned().collect(),
    }
}

fn validate_containers(raw: &[RawContainer], problems: &mut Problems) -> Vec<ContainerSpec> {
    if raw.is_empty() {
        problems.push("no container processes were specified".to_string());
        return Vec::new();
    }

    let mut ids = HashSet::new();
    let mut specs = Vec::with_capacity(raw.len());

    for (idx, c) in raw.iter().enumerate() {
        let label = format!("container #{}", idx + 1);
        let id = required_id(c.id.as_deref(), &label, "container", &mut ids, problems);
        let command = required(c.command.as_deref(), &label, "command", problems);
        let working_dir = required(c.working_dir.as_deref(), &label, "working_dir", problems);

        if let (Some(id), Some(command), Some(working_dir)) = (id, command, working_dir) {
            specs.push(ContainerSpec {
                id,
                command,
                working_dir: PathBuf::from(working_dir),
                start_watch: c.start_watch.clone(),
                failure_watch: c.failure_watch.clone(),
                env: c.env.clone(),
            });
        }
    }

    specs
}

fn validate_testers(raw: &[RawTester], problems: &mut Problems) -> Vec<TesterSpec> {
    if raw.is_empty() {
        // A run with only containers still starts and stops them cleanly.
        warn!("no tester processes were specified");
        return Vec::new();
    }

    let mut ids = HashSet::new();
    let mut specs = Vec::with_capacity(raw.len());

    for (idx, t) in raw.iter().enumerate() {
        let label = format!("tester #{}", idx + 1);
        let id = required_id(t.id.as_deref(), &label, "tester", &mut ids, problems);
        let command = required(t.command.as_deref(), &label, "command", problems);
        let working_dir = required(t.working_dir.as_deref(), &label, "working_dir", problems);
        let startup_delay = millis(
            t.startup_delay.as_ref(),
            &format!("{label} startup_delay"),
            problems,
        );
        let completion_timeout = millis(
            t.completion_timeout.as_ref(),
            &format!("{label} completion_timeout"),
            problems,
        );

        if let (Some(id), Some(command), Some(working_dir)) = (id, command, working_dir) {
            specs.push(TesterSpec {
                id,
                command,
                working_dir: PathBuf::from(working_dir),
                startup_delay,
                completion_timeout,
                watch: t.watch.clone(),
                failure_watch: t.failure_watch.clone(),
                env: t.env.clone(),
            });
        }
    }

    specs
}

fn required_id(
    id: Option<&str>,
    label: &str,
    group: &str,
    seen: &mut HashSet<String>,
    problems: &mut Problems,
) -> Option<String> {
    let id = required(id, label, "id", problems)?;
    if !seen.insert(id.clone()) {
        problems.push(format!(
            "there is more than one {group} process with id '{id}'"
        ));
        return None;
    }
    Some(id)
}

fn required(value: Option<&str>, label: &str, field: &str, problems: &mut Problems) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            problems.push(format!("{label}: `{field}` not specified"));
            None
        }
    }
}

fn millis(
    value: Option<&RawMillis>,
    what: &str,
    problems: &mut Problems,
) -> Option<std::time::Duration> {
    let value = value?;
    match value.to_duration() {
        Ok(d) => Some(d),
        Err(e) => {
            problems.push(format!("invalid {what}: {e}"));
            None
        }
    }
}
