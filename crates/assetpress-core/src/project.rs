//! Project configuration: the asset bundle patterns declared in `app.json`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// File name of the project configuration document.
pub const PROJECT_CONFIG_FILE: &str = "app.json";

/// The parts of a project's `app.json` that asset selection cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Glob patterns (relative to the project root) of bundled assets
    pub asset_bundle_patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppJson {
    #[serde(default)]
    expo: Option<AppSection>,
    #[serde(default)]
    asset_bundle_patterns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSection {
    #[serde(default)]
    asset_bundle_patterns: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Read the project configuration from `<root>/app.json`.
    ///
    /// A missing file or missing pattern list yields an empty pattern set;
    /// the selector then falls back to matching everything.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(project_root);
        if !path.exists() {
            tracing::debug!(
                "No {} in {:?}, using default asset patterns",
                PROJECT_CONFIG_FILE,
                project_root
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let app: AppJson = serde_json::from_str(&content)
            .map_err(|source| ConfigError::ProjectParse { path, source })?;

        // The nested `expo` section wins over a bare top-level key
        let asset_bundle_patterns = app
            .expo
            .and_then(|section| section.asset_bundle_patterns)
            .or(app.asset_bundle_patterns)
            .unwrap_or_default();

        Ok(Self {
            asset_bundle_patterns,
        })
    }

    /// Location of the project configuration document.
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_CONFIG_FILE)
    }
}
