//! Binding configuration loading and process-wide initialization
//!
//! This binary initializes the bindings explicitly. Only
//! `test_explicit_init_drives_save_precision` may touch native objects.

use femlink::{sys, BindingConfig, ConfigError, ErrorAction, Mesh};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let config_path = dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
error_action = "abort"
save_precision = 12
"#,
    );

    let config = BindingConfig::load_from_file(&path).unwrap();
    assert_eq!(
        config,
        BindingConfig {
            error_action: ErrorAction::Abort,
            save_precision: 12,
        }
    );
}

#[test]
fn test_written_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let config = BindingConfig {
        error_action: ErrorAction::Abort,
        save_precision: 3,
    };
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("error_action = \"abort\""), "{text}");

    let path = create_config_file(temp_dir.path(), &text);
    assert_eq!(BindingConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_toml_syntax_error_names_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "save_precision = ");

    match BindingConfig::load_from_file(&path) {
        Err(ConfigError::TomlParseError { file, .. }) => assert_eq!(file, path),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_unknown_error_action_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "error_action = \"ignore\"");
    assert!(BindingConfig::load_from_file(&path).is_err());
}

#[test]
#[serial]
fn test_explicit_init_drives_save_precision() {
    let config = BindingConfig {
        error_action: ErrorAction::Throw,
        save_precision: 5,
    };
    assert_eq!(femlink::init(config.clone()).unwrap(), &config);
    assert_eq!(sys::get_error_action(), sys::ErrorAction::Throw);

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("square.mesh");
    let mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    mesh.save(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("1.0000e0"), "{text}");

    let other = BindingConfig {
        save_precision: 6,
        ..config
    };
    assert!(matches!(femlink::init(other), Err(ConfigError::AlreadyInitialized)));
}
