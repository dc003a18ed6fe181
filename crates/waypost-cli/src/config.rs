//! Configuration file management.
//!
//! Settings are read from `config.toml` in the platform config directory
//! (or the file named by `--config`). Every section is optional; missing
//! keys take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use waypost_core::{DisplayZone, TrackingOptions, WindowFilter};
use waypost_types::{OperatorId, TimeOfDay, TimeWindow};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub operator: OperatorConfig,
    pub tracking: TrackingConfig,
    pub display: DisplayConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Default config file path.
    pub fn path() -> PathBuf {
        default_config_path()
    }

    /// Load the default config file, or defaults if it does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - The operator id, when set, is not blank
    /// - The tracking period and timeout are non-zero
    /// - The display zone is `local`, `UTC`, `+HH:MM` or an IANA name
    /// - The storage path is not empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.operator.validate());
        errors.extend(self.tracking.validate());
        errors.extend(self.display.validate());
        errors.extend(self.storage.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Tracking options built from the `[tracking]` section.
    pub fn tracking_options(&self) -> TrackingOptions {
        let t = &self.tracking;
        TrackingOptions::with_period(Duration::from_secs(t.period_secs))
            .high_accuracy(t.high_accuracy)
            .timeout(Duration::from_millis(t.timeout_ms))
            .max_cached_age(Duration::from_millis(t.max_cached_age_ms))
    }
}

/// `[operator]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Operator recorded as `tracker_id` on every location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl OperatorConfig {
    pub fn operator_id(&self) -> Option<OperatorId> {
        self.id.as_deref().map(OperatorId::new)
    }

    fn validate(&self) -> Vec<ValidationError> {
        match &self.id {
            Some(id) if id.trim().is_empty() => vec![ValidationError {
                field: "operator.id".to_string(),
                message: "operator id cannot be blank".to_string(),
            }],
            _ => Vec::new(),
        }
    }
}

/// `[tracking]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Seconds between fixes.
    pub period_secs: u64,
    pub high_accuracy: bool,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Oldest cached fix accepted, in milliseconds.
    pub max_cached_age_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let defaults = TrackingOptions::default();
        Self {
            period_secs: defaults.period.as_secs(),
            high_accuracy: defaults.position.high_accuracy,
            timeout_ms: defaults.position.timeout.as_millis() as u64,
            max_cached_age_ms: defaults.position.max_cached_age.as_millis() as u64,
        }
    }
}

impl TrackingConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.period_secs == 0 {
            errors.push(ValidationError {
                field: "tracking.period_secs".to_string(),
                message: "period must be at least 1 second".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            errors.push(ValidationError {
                field: "tracking.timeout_ms".to_string(),
                message: "timeout must be greater than 0".to_string(),
            });
        }
        errors
    }
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// `local`, `UTC`, a fixed offset such as `+02:00`, or an IANA zone
    /// such as `America/Los_Angeles`.
    pub utc_offset: String,
    /// Default window start.
    pub start: TimeOfDay,
    /// Default window end.
    pub end: TimeOfDay,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let window = TimeWindow::default();
        Self {
            utc_offset: "local".to_string(),
            start: window.start,
            end: window.end,
        }
    }
}

impl DisplayConfig {
    /// Parse the configured zone.
    pub fn zone(&self) -> Result<DisplayZone, String> {
        self.utc_offset.parse()
    }

    /// Window filter for the configured zone.
    pub fn window_filter(&self) -> WindowFilter {
        match self.zone() {
            Ok(zone) => WindowFilter::new(zone),
            Err(e) => {
                warn!("Invalid display.utc_offset ({}), using UTC", e);
                WindowFilter::utc()
            }
        }
    }

    fn validate(&self) -> Vec<ValidationError> {
        match self.zone() {
            Ok(_) => Vec::new(),
            Err(message) => vec![ValidationError {
                field: "display.utc_offset".to_string(),
                message,
            }],
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: waypost_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Vec<ValidationError> {
        if self.path.as_os_str().is_empty() {
            vec![ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            }]
        } else {
            Vec::new()
        }
    }
}

/// Default config file path.
///
/// - Linux: `~/.config/waypost/config.toml`
/// - macOS: `~/Library/Application Support/waypost/config.toml`
/// - Windows: `C:\Users\<user>\AppData\Roaming\waypost\config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("waypost")
        .join("config.toml")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `tracking.period_secs`).
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
