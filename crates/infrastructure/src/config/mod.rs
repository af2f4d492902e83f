//! Agent configuration: structs, parsing, and validation.

mod common;

pub use common::{ConfigError, LogFormat, LogLevel};

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_NETWORK_MAP_PATH;

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub acl: AclSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclSection {
    /// Where the agent reads the control-plane network map from.
    #[serde(default = "default_network_map_path")]
    pub network_map_path: String,
}

impl Default for AclSection {
    fn default() -> Self {
        Self {
            network_map_path: default_network_map_path(),
        }
    }
}

fn default_network_map_path() -> String {
    DEFAULT_NETWORK_MAP_PATH.to_string()
}

impl AgentConfig {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when the
    /// file does not exist. Used for the default config path, where a
    /// missing file is a normal fresh-install state.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AgentConfig::default();
        assert_eq!(config.agent.log_level, LogLevel::Info);
        assert_eq!(config.agent.log_format, LogFormat::Text);
        assert_eq!(config.acl.network_map_path, DEFAULT_NETWORK_MAP_PATH);
    }

    #[test]
    fn parse_full_config() {
        let config = AgentConfig::from_yaml(
            r"
agent:
  log_level: debug
  log_format: json
acl:
  network_map_path: /var/lib/netfence/map.json
",
        )
        .unwrap();

        assert_eq!(config.agent.log_level, LogLevel::Debug);
        assert_eq!(config.agent.log_format, LogFormat::Json);
        assert_eq!(config.acl.network_map_path, "/var/lib/netfence/map.json");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = AgentConfig::from_yaml("agent:\n  log_level: warn\n").unwrap();
        assert_eq!(config.agent.log_level, LogLevel::Warn);
        assert_eq!(config.acl.network_map_path, DEFAULT_NETWORK_MAP_PATH);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(AgentConfig::from_yaml("bogus: true\n").is_err());
        assert!(AgentConfig::from_yaml("acl:\n  bogus: true\n").is_err());
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let config = AgentConfig::load_or_default(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.agent.log_level, LogLevel::Info);
    }
}
