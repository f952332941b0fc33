//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Optimization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    /// Recompression quality (1-100)
    pub quality: u8,

    /// Maximum number of assets hashed or recompressed at once
    pub parallel_workers: usize,

    /// Keep `.orig` backups next to replaced assets (opt-in)
    pub keep_originals: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            parallel_workers: 4,
            keep_originals: false,
        }
    }
}

/// Asset selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Directory names never descended into while expanding patterns
    pub ignored_dirs: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: vec![
                "node_modules".to_string(),
                "ios".to_string(),
                "android".to_string(),
                "web-build".to_string(),
            ],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty, json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
