//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be properly loaded,
//! validated, and processed with path expansion.

use parley_engine::config::Config;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let data_dir = dir.path().join("data");
    let contents = format!(
        "[core]\nlog_level = \"debug\"\ndata_dir = {:?}\n\n{}",
        data_dir.display().to_string(),
        body
    );
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[matching]
confidence_threshold = 0.75
entry_intent = "start"
termination_inputs = ["quit", "bye"]

[console]
unmatched_log = "logs/unmatched.txt"
show_hints = false
color = false

[speech]
enabled = true
command = ["recognise", "--once"]
"#,
    );

    let config = Config::load_from_path(&path).expect("config loads");
    assert_eq!(config.core.log_level, "debug");
    assert!(config.core.data_dir.is_dir(), "data dir is created");
    assert_eq!(config.matching.confidence_threshold, 0.75);
    assert!(!config.console.show_hints);
    assert_eq!(
        config.console.unmatched_log,
        dir.path().join("data").join("logs/unmatched.txt")
    );

    let settings = config.engine_settings();
    assert_eq!(settings.entry_intent, "start");
    assert!(settings.is_termination("quit"));
    assert!(!settings.is_termination("exit"));

    let speech = config.speech_capture().expect("speech enabled");
    assert_eq!(speech.program(), "recognise");
}

#[test]
fn test_missing_sections_take_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.matching.confidence_threshold, 0.6);
    assert_eq!(config.matching.entry_intent, "entry");
    assert_eq!(config.matching.termination_inputs, vec!["end", "exit"]);
    assert!(config.console.show_hints);
    assert!(config.speech_capture().is_none());
}

#[test]
fn test_threshold_out_of_range() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[matching]\nconfidence_threshold = 1.5\n");

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("confidence_threshold"));
}

#[test]
fn test_termination_inputs_must_not_be_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[matching]\ntermination_inputs = []\n");
    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn test_invalid_log_level() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[core]\nlog_level = \"loud\"\n").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_invalid_token_pattern() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[matching]\ntoken_pattern = \"(\"\n");
    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn test_speech_enabled_without_command() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[speech]\nenabled = true\n");
    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn test_wrong_value_type_fails_parse() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[matching]\nconfidence_threshold = \"high\"\n");
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}
