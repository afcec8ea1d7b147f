//! Runner configuration and the config fact store.
//!
//! [`RunnerConfig`] carries the monitor's retry budget and the location of
//! the optional config payload. [`ConfigStore`] loads that payload once and
//! flattens it under `CONFIG`.

use std::path::{Path as FsPath, PathBuf};
use std::time::Duration;

use vouch_core::{FactStore, Path, Value, CONFIG};

pub const DEFAULT_MAX_RETRY: u32 = 3;
pub const DEFAULT_BACK_OFF_DELAY: Duration = Duration::from_millis(1000);

pub const ENV_MAX_RETRY: &str = "VOUCH_MAX_RETRY";
pub const ENV_BACK_OFF_DELAY_MS: &str = "VOUCH_BACKOFF_DELAY_MS";
pub const ENV_CONFIG_PATH: &str = "VOUCH_CONFIG_PATH";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: \"{value}\"")]
    InvalidValue { name: String, value: String },

    #[error("could not read config payload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config payload {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of monitor polls.
    pub max_retry: u32,
    /// Base delay; the wait before poll `n` (from 1) is `back_off_delay * 2^(n-1)`.
    pub back_off_delay: Duration,
    pub config_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            max_retry: DEFAULT_MAX_RETRY,
            back_off_delay: DEFAULT_BACK_OFF_DELAY,
            config_path: None,
        }
    }
}

impl RunnerConfig {
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn with_back_off_delay(mut self, delay: Duration) -> Self {
        self.back_off_delay = delay;
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Defaults overridden by `VOUCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = RunnerConfig::default();
        if let Some(raw) = lookup(ENV_MAX_RETRY) {
            config.max_retry = parse_number(ENV_MAX_RETRY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BACK_OFF_DELAY_MS) {
            config.back_off_delay = Duration::from_millis(parse_number(ENV_BACK_OFF_DELAY_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_CONFIG_PATH).filter(|p| !p.trim().is_empty()) {
            config.config_path = Some(PathBuf::from(raw));
        }
        Ok(config)
    }

    /// Sleep before poll `attempt` (counted from 0; the first poll does not wait).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => {
                let factor = 1u32.checked_shl(n - 1).unwrap_or(u32::MAX);
                self.back_off_delay.saturating_mul(factor)
            }
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
    })
}

/// The immutable config fact store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    facts: FactStore,
}

impl ConfigStore {
    /// Load the payload at `path`. No path, or no file, gives an empty store.
    pub fn load(path: Option<&FsPath>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(ConfigStore::default());
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config payload");
                return Ok(ConfigStore::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let payload: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(ConfigStore::from_value(&Value::from(payload)))
    }

    pub fn from_value(payload: &Value) -> Self {
        ConfigStore {
            facts: FactStore::flatten(payload, &Path::root().field(CONFIG)),
        }
    }

    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    pub fn into_facts(self) -> FactStore {
        self.facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.max_retry, 3);
        assert_eq!(config.back_off_delay, Duration::from_millis(1000));
    }

    #[test]
    fn environment_overrides() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (ENV_MAX_RETRY, "5"),
            (ENV_BACK_OFF_DELAY_MS, "250"),
            (ENV_CONFIG_PATH, "/tmp/config.json"),
        ]))
        .unwrap();
        assert_eq!(config.max_retry, 5);
        assert_eq!(config.back_off_delay, Duration::from_millis(250));
        assert_eq!(config.config_path, Some(PathBuf::from("/tmp/config.json")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = RunnerConfig::from_lookup(lookup(&[(ENV_MAX_RETRY, "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == ENV_MAX_RETRY));
    }

    #[test]
    fn exponential_delays() {
        let config = RunnerConfig::default();
        let delays: Vec<u128> = (0..5).map(|n| config.delay_before(n).as_millis()).collect();
        assert_eq!(delays, vec![0, 1000, 2000, 4000, 8000]);
        assert_eq!(config.delay_before(60), Duration::from_millis(1000) * u32::MAX);
    }

    #[test]
    fn missing_payload_is_empty() {
        assert!(ConfigStore::load(None).unwrap().facts().is_empty());
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert!(store.facts().is_empty());
    }

    #[test]
    fn payload_is_flattened_under_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, json!({"patch": {"Product": {"price": [1000, 2000]}}}).to_string())
            .unwrap();
        let store = ConfigStore::load(Some(&path)).unwrap();
        assert_eq!(
            store.facts().get("CONFIG.patch.Product.price[1]"),
            Some(&Value::from(2000))
        );
    }

    #[test]
    fn invalid_payload_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ConfigStore::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
