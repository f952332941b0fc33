//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.optimize.quality) {
            return Err(ConfigError::ValidationError(
                "optimize.quality must be between 1 and 100".into(),
            ));
        }
        if self.optimize.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "optimize.parallel_workers must be > 0".into(),
            ));
        }
        if self
            .selection
            .ignored_dirs
            .iter()
            .any(|d| d.is_empty() || d.contains('/') || d.contains('\\'))
        {
            return Err(ConfigError::ValidationError(
                "selection.ignored_dirs entries must be plain directory names".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
