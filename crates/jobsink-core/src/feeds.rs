//! Feed source set configuration.
//!
//! The set of feed URLs a sweep covers is declared in a YAML file
//! (`config/feeds.yaml` by default) so sources can be added without a
//! redeploy.

use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Human-readable label recorded on every run this set triggers.
    pub source_label: String,
    pub urls: Vec<String>,
}

/// Load the feed source set from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::FeedsFile`] if the file cannot be read or parsed,
/// or declares no URLs.
pub fn load_feeds_config(path: &Path) -> Result<FeedsConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FeedsFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let config: FeedsConfig =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::FeedsFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if config.urls.is_empty() {
        return Err(ConfigError::FeedsFile {
            path: path.display().to_string(),
            reason: "no feed urls declared".to_string(),
        });
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feeds_yaml() {
        let yaml = "source_label: \"nightly sweep\"\nurls:\n  - https://a.test/feed.xml\n  - https://b.test/jobs.rss\n";
        let config: FeedsConfig = serde_yaml::from_str(yaml).expect("valid feeds yaml");
        assert_eq!(config.source_label, "nightly sweep");
        assert_eq!(config.urls.len(), 2);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = load_feeds_config(Path::new("/nonexistent/feeds.yaml"));
        assert!(matches!(result, Err(ConfigError::FeedsFile { .. })));
    }
}
