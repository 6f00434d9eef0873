//! Configuration management
//!
//! This module handles loading, validation, and management of the Parley configuration.
//! Configuration is stored in TOML format at ~/.parley/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **matching**: Confidence threshold, entry intent, termination inputs, token pattern
//! - **console**: Unmatched-input log, hints, colors
//! - **speech**: Optional external speech recogniser
//!
//! Every section may be omitted; missing values take their defaults.
//!
//! # Path Expansion
//!
//! `~` is expanded to the user's home directory in `core.data_dir` and
//! `console.unmatched_log`. The data directory is created if it does not exist.
//! A relative `unmatched_log` resolves against `core.data_dir`.
//!
//! # Examples
//!
//! ```no_run
//! use parley_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! // Access configuration values
//! println!("Threshold: {}", config.matching.confidence_threshold);
//! println!("Unmatched inputs: {:?}", config.console.unmatched_log);
//! # Ok(())
//! # }
//! ```

use regex::Regex;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::console::SpeechCapture;
use crate::conversation::{
    EngineSettings, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_ENTRY_INTENT,
    DEFAULT_TERMINATION_INPUTS,
};
use crate::feature_space::DEFAULT_TOKEN_PATTERN;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Intent matching settings
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Console settings
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Speech capture (optional)
    #[serde(default)]
    pub speech: SpeechConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Intent matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum similarity for a match to be acted on (0.0-1.0)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Intent every conversation starts in
    #[serde(default = "default_entry_intent")]
    pub entry_intent: String,

    /// Inputs that end a conversation
    #[serde(default = "default_termination_inputs")]
    pub termination_inputs: Vec<String>,

    /// Regex that splits text into tokens
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
}

/// Console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// File that collects inputs the engine did not understand
    #[serde(default = "default_unmatched_log")]
    pub unmatched_log: PathBuf,

    /// Show "Things to do" before each prompt
    #[serde(default = "default_true")]
    pub show_hints: bool,

    /// Color status lines
    #[serde(default = "default_true")]
    pub color: bool,
}

/// Speech capture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Capture speech when an empty line is entered
    #[serde(default)]
    pub enabled: bool,

    /// Program and arguments that print one recognised utterance to stdout
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.parley")
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_entry_intent() -> String {
    DEFAULT_ENTRY_INTENT.to_string()
}

fn default_termination_inputs() -> Vec<String> {
    DEFAULT_TERMINATION_INPUTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_unmatched_log() -> PathBuf {
    PathBuf::from("not_understood.txt")
}

fn default_true() -> bool {
    true
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            entry_intent: default_entry_intent(),
            termination_inputs: default_termination_inputs(),
            token_pattern: default_token_pattern(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            unmatched_log: default_unmatched_log(),
            show_hints: true,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.parley/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    pub fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable ~ paths
        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.parley/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".parley").join("config.toml"))
    }

    /// Settings for a conversation engine
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            confidence_threshold: self.matching.confidence_threshold,
            entry_intent: self.matching.entry_intent.clone(),
            termination_inputs: self.matching.termination_inputs.clone(),
        }
    }

    /// The speech recogniser, if enabled
    pub fn speech_capture(&self) -> Option<SpeechCapture> {
        if self.speech.enabled {
            SpeechCapture::from_command(&self.speech.command)
        } else {
            None
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates ranges and required values
    /// - Expands ~ in paths
    /// - Creates the data directory if it doesn't exist
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let threshold = self.matching.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::Config(
                "confidence_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.matching.entry_intent.trim().is_empty() {
            return Err(EngineError::Config(
                "entry_intent must not be empty".to_string(),
            ));
        }

        if self.matching.termination_inputs.is_empty() {
            return Err(EngineError::Config(
                "termination_inputs must list at least one input".to_string(),
            ));
        }

        Regex::new(&self.matching.token_pattern).map_err(|e| {
            EngineError::Config(format!(
                "Invalid token_pattern '{}': {}",
                self.matching.token_pattern, e
            ))
        })?;

        if self.speech.enabled && SpeechCapture::from_command(&self.speech.command).is_none() {
            return Err(EngineError::Config(
                "speech.command is required when speech is enabled".to_string(),
            ));
        }

        // Expand and validate data directory
        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        let unmatched_log = expand_path(&self.console.unmatched_log)?;
        self.console.unmatched_log = if unmatched_log.is_relative() {
            self.core.data_dir.join(unmatched_log)
        } else {
            unmatched_log
        };

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
