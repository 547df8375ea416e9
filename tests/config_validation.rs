// tests/config_validation.rs

use std::error::Error;
use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use testrig::config::{load_and_validate, HarnessConfig, RawContainer, RawMillis, RawTester};
use testrig::errors::HarnessError;
use testrig_test_utils::builders::RawConfigBuilder;
use testrig_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{contents}")?;
    Ok(file)
}

fn problems_of(result: testrig::errors::Result<HarnessConfig>) -> Vec<String> {
    match result {
        Err(HarnessError::ConfigError { problems }) => problems,
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_is_parsed_in_declared_order() -> TestResult {
    init_tracing();

    let file = write_config(
        r#"
[config]
containers_startup_timeout = 30000
tests_completion_timeout = "600000"
fail_fast = false
private_environment_variables = ["API_TOKEN"]

[[container]]
id = "server"
command = "./run-server.sh"
working_dir = "."
start_watch = "READY"
failure_watch = "FATAL"
env = { PORT = "8080" }

[[tester]]
id = "zeta"
command = "./zeta.sh"
working_dir = "tests"
startup_delay = 500
completion_timeout = "2000"
watch = "PASS"
failure_watch = "FAIL"

[[tester]]
id = "alpha"
command = "./alpha.sh"
working_dir = "tests"
"#,
    )?;

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.settings.containers_startup_timeout, Some(Duration::from_secs(30)));
    assert_eq!(cfg.settings.tests_completion_timeout, Some(Duration::from_secs(600)));
    assert!(!cfg.settings.fail_fast);
    assert!(cfg.settings.private_environment_variables.contains("API_TOKEN"));

    assert_eq!(cfg.containers.len(), 1);
    let server = &cfg.containers[0];
    assert_eq!(server.effective_start_watch(), Some("READY"));
    assert_eq!(server.failure_watch.as_deref(), Some("FATAL"));
    assert_eq!(server.env.get("PORT").map(String::as_str), Some("8080"));

    let ids: Vec<_> = cfg.testers.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["zeta", "alpha"]);
    assert_eq!(cfg.testers[0].startup_delay, Some(Duration::from_millis(500)));
    assert_eq!(cfg.testers[0].completion_timeout, Some(Duration::from_secs(2)));
    assert_eq!(cfg.testers[1].startup_delay, None);
    assert_eq!(cfg.testers[1].completion_timeout, None);

    Ok(())
}

#[test]
fn fail_fast_defaults_to_true() -> TestResult {
    init_tracing();

    let file = write_config(
        r#"
[[container]]
id = "server"
command = "sleep 1"
working_dir = "."
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert!(cfg.settings.fail_fast);
    assert!(cfg.testers.is_empty());

    Ok(())
}

#[test]
fn duplicate_ids_are_reported_per_group() {
    init_tracing();

    let raw = RawConfigBuilder::new()
        .with_container("db", "sleep 1")
        .with_container("db", "sleep 2")
        .with_tester("db", "true")
        .with_tester("t1", "true")
        .with_tester("t1", "false")
        .build_raw();

    let problems = problems_of(HarnessConfig::try_from(raw));

    assert_eq!(problems.len(), 2, "{problems:?}");
    assert!(problems[0].contains("more than one container process with id 'db'"));
    assert!(problems[1].contains("more than one tester process with id 't1'"));
}

#[test]
fn every_missing_field_is_counted() {
    init_tracing();

    let raw = RawConfigBuilder::new()
        .with_raw_container(RawContainer {
            id: Some("db".to_string()),
            ..RawContainer::default()
        })
        .with_raw_tester(RawTester {
            command: Some("true".to_string()),
            working_dir: Some("  ".to_string()),
            ..RawTester::default()
        })
        .build_raw();

    let err = HarnessConfig::try_from(raw).unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("4 configuration error(s) found"), "{msg}");

    let problems = match err {
        HarnessError::ConfigError { problems } => problems,
        other => panic!("Expected ConfigError, got: {:?}", other),
    };
    assert!(problems.iter().any(|p| p.contains("container #1: `command`")));
    assert!(problems.iter().any(|p| p.contains("container #1: `working_dir`")));
    assert!(problems.iter().any(|p| p.contains("tester #1: `id`")));
    assert!(problems.iter().any(|p| p.contains("tester #1: `working_dir`")));
}

#[test]
fn non_numeric_startup_delay_is_a_config_error() {
    init_tracing();

    let raw = RawConfigBuilder::new()
        .with_container("db", "sleep 1")
        .with_tester_delay("t1", "true", RawMillis::Text("soon".to_string()))
        .build_raw();

    let problems = problems_of(HarnessConfig::try_from(raw));
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("startup_delay"));
    assert!(problems[0].contains("'soon'"));
}

#[test]
fn negative_timeout_is_a_config_error() -> TestResult {
    init_tracing();

    let file = write_config(
        r#"
[config]
containers_startup_timeout = -5

[[container]]
id = "server"
command = "sleep 1"
working_dir = "."
"#,
    )?;

    let problems = problems_of(load_and_validate(file.path()));
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("containers_startup_timeout"));

    Ok(())
}

#[test]
fn config_without_containers_is_rejected() {
    init_tracing();

    let raw = RawConfigBuilder::new().with_tester("t1", "true").build_raw();

    let problems = problems_of(HarnessConfig::try_from(raw));
    assert_eq!(problems, vec!["no container processes were specified".to_string()]);
}

#[test]
fn malformed_toml_is_a_parse_error() -> TestResult {
    init_tracing();

    let file = write_config("[[container]\nid = ")?;

    match load_and_validate(file.path()) {
        Err(HarnessError::TomlError(_)) => Ok(()),
        other => panic!("Expected TomlError, got: {:?}", other),
    }
}
