//! Configuration types.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Connection settings for the Genie service.
#[derive(Debug, Clone)]
pub struct GenieConfig {
    /// Base URL of the hosting workspace, e.g. `https://acme.cloud.example.com`.
    pub host: String,
    /// Bearer token attached to every request.
    pub token: SecretString,
    /// Pacing for message-completion polls.
    pub poll: PollConfig,
}

impl GenieConfig {
    /// Build configuration from the environment.
    ///
    /// `GENIE_HOST` / `GENIE_TOKEN` take precedence, with the warehouse CLI
    /// variables (`DATABRICKS_HOST` / `DATABRICKS_TOKEN`) as fallbacks.
    /// `GENIE_POLL_INTERVAL_SECS` and `GENIE_POLL_TIMEOUT_SECS` override the
    /// poll pacing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_any(&["GENIE_HOST", "DATABRICKS_HOST"])
            .ok_or_else(|| ConfigError::MissingEnvVar("GENIE_HOST".into()))?;
        let token = env_any(&["GENIE_TOKEN", "DATABRICKS_TOKEN"])
            .ok_or_else(|| ConfigError::MissingEnvVar("GENIE_TOKEN".into()))?;

        let mut poll = PollConfig::default();
        if let Some(interval) = env_duration_secs("GENIE_POLL_INTERVAL_SECS")? {
            poll.interval = interval;
        }
        if let Some(timeout) = env_duration_secs("GENIE_POLL_TIMEOUT_SECS")? {
            poll.timeout = timeout;
        }

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            token: SecretString::from(token),
            poll,
        })
    }
}

/// Pacing for the bounded message poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Sleep between consecutive fetches of the message resource.
    pub interval: Duration,
    /// Wall-clock budget before a poll gives up with a timeout.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// A Genie space the client knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    pub id: String,
    pub name: String,
}

/// Load the space registry from a JSON file. A missing file is an empty
/// registry, not an error.
pub fn load_spaces(path: &Path) -> Result<Vec<SpaceConfig>, ConfigError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Persist the space registry as pretty-printed JSON.
pub fn save_spaces(path: &Path, spaces: &[SpaceConfig]) -> Result<(), ConfigError> {
    let raw = serde_json::to_string_pretty(spaces)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    std::fs::write(path, raw)?;
    Ok(())
}

fn env_any(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
}

fn env_duration_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a whole number of seconds, got {raw:?}"),
            })?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_config_defaults() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval, Duration::from_secs(2));
        assert_eq!(poll.timeout, Duration::from_secs(300));
    }

    #[test]
    fn spaces_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spaces.json");
        let spaces = vec![
            SpaceConfig {
                id: "01f04a88".into(),
                name: "Default Space".into(),
            },
            SpaceConfig {
                id: "01f04a89".into(),
                name: "Trading".into(),
            },
        ];

        save_spaces(&path, &spaces).unwrap();
        assert_eq!(load_spaces(&path).unwrap(), spaces);
    }

    #[test]
    fn missing_spaces_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_spaces(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn malformed_spaces_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spaces.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_spaces(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
