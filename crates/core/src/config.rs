use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Engine settings persisted to a JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Host frame rate; autofollow delays are quantized to whole frames at
    /// this rate.
    pub frame_rate: f64,
    /// Default scene-graph root for snapshot capture.
    pub snapshot_root: String,
    /// Default capture depth below the root.
    pub snapshot_max_depth: u32,
    /// Nodes whose path contains this marker belong to the engine's own
    /// housekeeping subtree and are never captured.
    pub exclude_marker: String,
    /// Defaults for osc actions that omit a destination.
    pub osc_host: String,
    pub osc_port: u16,
    /// Cue storage file used by the JSON-backed persistence port.
    pub cue_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            snapshot_root: "/project".to_string(),
            snapshot_max_depth: 3,
            exclude_marker: "cueflow_bridge".to_string(),
            osc_host: "127.0.0.1".to_string(),
            osc_port: 7000,
            cue_file: "cues.json".to_string(),
        }
    }
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

/// Loads and saves engine settings from a JSON file, defaulting to
/// `config.json` in the working directory.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));
        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from the configuration file, creating it with defaults
    /// when it does not exist yet.
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match engine version {}",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings)?;
        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to the configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            modified_at: chrono::Utc::now().to_rfc3339(),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(settings.frame_rate > 0.0 && settings.frame_rate <= 1000.0) {
            errors.push(format!(
                "frame_rate must be between 0 and 1000, got {}",
                settings.frame_rate
            ));
        }
        if settings.snapshot_max_depth < 1 {
            errors.push("snapshot_max_depth must be at least 1".to_string());
        }
        if settings.snapshot_root.is_empty() {
            errors.push("snapshot_root must not be empty".to_string());
        }
        if settings.exclude_marker.is_empty() {
            errors.push("exclude_marker must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors))
        }
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}
