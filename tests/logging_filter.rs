// tests/logging_filter.rs

use testrig::cli::LogLevel;
use testrig::logging::{filter_directives, OUTPUT_TARGET};
use tracing_subscriber::EnvFilter;

#[test]
fn cli_level_wins_over_environment() {
    assert_eq!(
        filter_directives(Some(LogLevel::Debug), Some("warn"), false),
        "debug"
    );
}

#[test]
fn environment_is_taken_as_directives() {
    assert_eq!(
        filter_directives(None, Some("info,testrig::output=warn"), false),
        "info,testrig::output=warn"
    );
}

#[test]
fn blank_or_missing_environment_defaults_to_info() {
    assert_eq!(filter_directives(None, None, false), "info");
    assert_eq!(filter_directives(None, Some("  "), false), "info");
}

#[test]
fn hiding_process_output_turns_its_target_off() {
    let directives = filter_directives(Some(LogLevel::Trace), None, true);
    assert_eq!(directives, format!("trace,{OUTPUT_TARGET}=off"));
    assert!(EnvFilter::try_new(&directives).is_ok(), "{directives}");
}
