//! Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Tunables for the request pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ceiling on the accumulated request body, in bytes. Applies to every
    /// decoder uniformly.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceiling_is_ten_mib() {
        assert_eq!(PipelineConfig::default().max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn parse_overrides_ceiling() {
        let config: PipelineConfig = toml::from_str("max_body_bytes = 1024").unwrap();
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    fn parse_empty_uses_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }
}
