//! Binding configuration
//!
//! Settings are read from `<config dir>/femlink/config.toml` when present,
//! then overridden by environment variables:
//! - `FEMLINK_ERROR_ACTION`: `throw` or `abort`
//! - `FEMLINK_SAVE_PRECISION`: digits used by `save` helpers
//!
//! The configuration is applied once per process, either explicitly through
//! [`init`] or implicitly by the first boundary call.

use femlink_sys as sys;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("Bindings already initialized with a different configuration")]
    AlreadyInitialized,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// What the native library does when it raises a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAction {
    /// Raise an exception, surfaced as `Error::NativeException`.
    #[default]
    Throw,
    /// Print the message and abort the process.
    Abort,
}

impl ErrorAction {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "throw" => Some(ErrorAction::Throw),
            "abort" => Some(ErrorAction::Abort),
            _ => None,
        }
    }
}

impl From<ErrorAction> for sys::ErrorAction {
    fn from(action: ErrorAction) -> Self {
        match action {
            ErrorAction::Throw => sys::ErrorAction::Throw,
            ErrorAction::Abort => sys::ErrorAction::Abort,
        }
    }
}

/// Settings applied to the native library and the safe surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct BindingConfig {
    /// Native fault behaviour (default: throw)
    pub error_action: ErrorAction,

    /// Significant digits written by `save` helpers (default: 8)
    pub save_precision: u32,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            error_action: ErrorAction::Throw,
            save_precision: 8,
        }
    }
}

impl BindingConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=17).contains(&self.save_precision) {
            return Err(ConfigError::InvalidValue {
                field: "save_precision".to_string(),
                reason: format!("must be between 1 and 17, got {}", self.save_precision),
            });
        }
        Ok(())
    }

    /// Apply `FEMLINK_*` environment variables
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(action) = lookup("FEMLINK_ERROR_ACTION") {
            self.error_action =
                ErrorAction::parse(&action).ok_or_else(|| ConfigError::InvalidValue {
                    field: "FEMLINK_ERROR_ACTION".to_string(),
                    reason: format!("must be 'throw' or 'abort', got '{}'", action),
                })?;
        }

        if let Some(precision) = lookup("FEMLINK_SAVE_PRECISION") {
            self.save_precision =
                precision
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "FEMLINK_SAVE_PRECISION".to_string(),
                        reason: format!("not a number: '{}'", precision),
                    })?;
        }

        self.validate()
    }

    /// Get the global config file path (<config dir>/femlink/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(dir.join("femlink").join("config.toml"))
    }

    /// Global file (if any) plus environment overrides
    pub fn load() -> ConfigResult<Self> {
        let mut config = match Self::global_config_path() {
            Ok(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }
}

/// Compile-time capabilities of the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether native faults can be raised as exceptions. Without this every
    /// fault aborts the process.
    pub native_exceptions: bool,
}

impl Capabilities {
    /// Read once per process.
    pub fn get() -> &'static Capabilities {
        static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();
        CAPABILITIES.get_or_init(|| Capabilities {
            native_exceptions: sys::NATIVE_USE_EXCEPTIONS,
        })
    }
}

static ACTIVE: OnceLock<BindingConfig> = OnceLock::new();

fn apply(config: BindingConfig) -> BindingConfig {
    if config.error_action == ErrorAction::Throw && !Capabilities::get().native_exceptions {
        log::warn!("native library built without exception support; native faults will abort");
    }
    sys::set_error_action(config.error_action.into());
    log::debug!(
        "bindings initialized (error action: {:?}, save precision: {})",
        config.error_action,
        config.save_precision
    );
    config
}

/// Apply `config` to the native library.
///
/// Only the first configuration takes effect. Repeating it is a no-op;
/// a different one fails with `AlreadyInitialized`.
pub fn init(config: BindingConfig) -> ConfigResult<&'static BindingConfig> {
    config.validate()?;
    let mut candidate = Some(config);
    let active = ACTIVE.get_or_init(|| apply(candidate.take().unwrap_or_default()));
    match candidate {
        Some(requested) if requested != *active => Err(ConfigError::AlreadyInitialized),
        _ => Ok(active),
    }
}

/// The configuration in effect, initializing from the environment if needed.
pub fn active() -> &'static BindingConfig {
    ACTIVE.get_or_init(|| {
        let config = BindingConfig::load().unwrap_or_else(|err| {
            log::warn!("ignoring femlink configuration: {err}");
            BindingConfig::default()
        });
        apply(config)
    })
}
