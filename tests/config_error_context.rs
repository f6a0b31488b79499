//! Tests for config error context preservation
//!
//! Verifies that configuration errors keep the original std::io::Error and
//! toml::de::Error as their source.

use csvpush::config::Config;
use csvpush::error::AppError;
use std::error::Error;
use std::fs;
use std::str::FromStr;
use tempfile::TempDir;

#[test]
fn test_config_file_read_error_preserves_io_error() {
    let result = Config::from_file("/nonexistent/path/to/csvpush.toml");

    let err = result.expect_err("Reading nonexistent file should fail");
    assert!(
        err.to_string().contains("/nonexistent/path/to/csvpush.toml"),
        "Error should include the file path, got: {}",
        err
    );

    let source = err.source().expect("Should have source error");
    assert!(
        source.is::<std::io::Error>(),
        "Source error should be io::Error, got: {:?}",
        source
    );
}

#[test]
fn test_config_parse_error_preserves_toml_error() {
    let invalid_toml = r#"
this is [[[[ not valid toml
it has {{{{ broken syntax
"#;

    let err = Config::from_str(invalid_toml).expect_err("Parsing invalid TOML should fail");

    let source = err.source().expect("Should have source error");
    assert!(
        source.is::<toml::de::Error>(),
        "Source error should be toml::de::Error, got: {:?}",
        source
    );
    assert!(err.to_string().contains("TOML"), "got: {}", err);
}

#[test]
fn test_validation_error_names_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[gateway]\ntimeout_seconds = 0\n").expect("Failed to write config");

    let err = Config::from_file(&config_path).expect_err("zero timeout should be rejected");

    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().contains("bad.toml"), "got: {}", err);
    assert!(err.to_string().contains("timeout_seconds"), "got: {}", err);
}

#[test]
fn test_wrong_value_type_is_parse_error() {
    let err = Config::from_str("[gateway]\ntimeout_seconds = \"thirty\"\n")
        .expect_err("string timeout should not parse");

    assert!(matches!(err, AppError::ConfigParseFailed { .. }));
}
