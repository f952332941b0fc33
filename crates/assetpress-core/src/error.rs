//! Error types for the assetpress optimization cache.
//!
//! Errors are split by how far they reach: run-level errors (configuration,
//! manifest, selection) abort a run, while per-asset errors are collected into
//! the run report so one bad file never hides the rest.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for assetpress operations.
#[derive(Error, Debug)]
pub enum AssetPressError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Manifest directory or document errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Asset selection errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse the project's app.json
    #[error("Failed to parse project config {path}: {source}")]
    ProjectParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Failures creating, reading, or writing the optimization manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest directory could not be created
    #[error("Cannot create manifest directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest document could not be read
    #[error("Cannot read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest exists but is not a flat digest object
    #[error("Manifest {path} is corrupt ({source}); fix or remove it before optimizing")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest document could not be written
    #[error("Cannot write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures expanding include/exclude patterns.
#[derive(Error, Debug)]
pub enum SelectionError {
    /// A glob pattern could not be compiled, or points outside the project root
    #[error("Invalid asset pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// The project root is missing or not a directory
    #[error("Project root not found: {0}")]
    RootNotFound(PathBuf),
}

/// Stage at which a single asset failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetPhase {
    /// Computing the content digest
    Hash,
    /// Running the recompression operation
    Recompress,
    /// Swapping the recompressed file into place
    Replace,
}

impl std::fmt::Display for AssetPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetPhase::Hash => write!(f, "hash"),
            AssetPhase::Recompress => write!(f, "recompress"),
            AssetPhase::Replace => write!(f, "replace"),
        }
    }
}

/// Per-asset errors. These never abort a run.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The asset could not be read or written
    #[error("IO error during {phase} for {path}: {source}")]
    Io {
        path: PathBuf,
        phase: AssetPhase,
        #[source]
        source: std::io::Error,
    },

    /// The recompression operation failed
    #[error("Recompression failed for {path}: {message}")]
    Recompress { path: PathBuf, message: String },
}

impl AssetError {
    /// Path of the asset this error belongs to.
    pub fn path(&self) -> &PathBuf {
        match self {
            AssetError::Io { path, .. } | AssetError::Recompress { path, .. } => path,
        }
    }

    /// Stage at which the asset failed.
    pub fn phase(&self) -> AssetPhase {
        match self {
            AssetError::Io { phase, .. } => *phase,
            AssetError::Recompress { .. } => AssetPhase::Recompress,
        }
    }
}

/// Convenience type alias for assetpress results.
pub type Result<T> = std::result::Result<T, AssetPressError>;
