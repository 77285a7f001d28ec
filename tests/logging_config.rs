use forrest::cli::LogLevel;
use forrest::errors::ForrestError;
use forrest::logging::{LogFormat, LoggingConfig, load_logging_config, resolve_directives};

#[test]
fn cli_level_beats_everything() {
    let file = LoggingConfig {
        level: Some("warning".to_string()),
        ..LoggingConfig::default()
    };
    let directives = resolve_directives(Some(LogLevel::Trace), Some("error"), &file, true);
    assert_eq!(directives, "trace");
}

#[test]
fn env_beats_file_and_verbose() {
    let file = LoggingConfig {
        level: Some("warning".to_string()),
        ..LoggingConfig::default()
    };
    assert_eq!(
        resolve_directives(None, Some("forrest=debug"), &file, true),
        "forrest=debug"
    );
    assert_eq!(resolve_directives(None, Some("  "), &file, false), "warn");
}

#[test]
fn verbose_only_changes_the_default() {
    let file = LoggingConfig::default();
    assert_eq!(resolve_directives(None, None, &file, false), "info");
    assert_eq!(resolve_directives(None, None, &file, true), "debug");
}

#[test]
fn file_filter_is_appended() {
    let file = LoggingConfig {
        filter: Some("notify=warn".to_string()),
        ..LoggingConfig::default()
    };
    assert_eq!(
        resolve_directives(Some(LogLevel::Info), None, &file, false),
        "info,notify=warn"
    );
}

#[test]
fn yaml_logging_config_is_parsed() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("logging.yml");
    std::fs::write(
        &path,
        "level: debug\nfilter: \"forrest::watch=trace\"\nformat: compact\nansi: false\n",
    )
    .unwrap();

    let cfg = load_logging_config(&path).unwrap();
    assert_eq!(cfg.level.as_deref(), Some("debug"));
    assert_eq!(cfg.filter.as_deref(), Some("forrest::watch=trace"));
    assert_eq!(cfg.format, LogFormat::Compact);
    assert_eq!(cfg.ansi, Some(false));
    assert_eq!(cfg.target, None);
}

#[test]
fn broken_logging_config_is_a_config_error() {
    let tmp = tempfile::tempdir().unwrap();

    let missing = load_logging_config(&tmp.path().join("nope.yml"));
    assert!(matches!(missing, Err(ForrestError::Config(_))));

    let path = tmp.path().join("logging.yml");
    std::fs::write(&path, "levle: debug\n").unwrap();
    assert!(matches!(load_logging_config(&path), Err(ForrestError::Config(_))));
}
