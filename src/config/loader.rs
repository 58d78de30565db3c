// ABOUTME: Reads crew definition files from disk or strings.
// ABOUTME: The format is picked from the file extension: .json, .yaml or .yml.

use std::path::Path;

use super::types::CrewConfig;
use crate::error::ConfigError;

impl CrewConfig {
    /// Load a crew file, choosing the parser from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_str() {
            "json" => Self::from_json_str,
            "yaml" | "yml" => Self::from_yaml_str,
            _ => {
                return Err(ConfigError::UnsupportedFormat(
                    path.display().to_string(),
                ));
            }
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            agents = config.agents.len(),
            "Loaded crew config"
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}
