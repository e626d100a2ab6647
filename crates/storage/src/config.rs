#![forbid(unsafe_code)]

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "calsvc.json";

/// Tunables of a store session.
///
/// Resolved from built-in defaults, then an optional `calsvc.json` in the
/// storage directory, then `CALSVC_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub busy_window_ms: u64,
    pub busy_poll_ms: u64,
    pub commit_attempts: u32,
    pub commit_backoff_initial_ms: u64,
    pub commit_backoff_max_ms: u64,
    pub instance_horizon_days: u32,
    pub max_instances_per_event: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_window_ms: 3000,
            busy_poll_ms: 20,
            commit_attempts: 6,
            commit_backoff_initial_ms: 10,
            commit_backoff_max_ms: 320,
            instance_horizon_days: 3660,
            max_instances_per_event: 2000,
        }
    }
}

impl StoreConfig {
    pub fn load(storage_dir: &Path) -> Result<Self, StoreError> {
        let path = storage_dir.join(CONFIG_FILE_NAME);
        let base = match std::fs::read_to_string(&path) {
            Ok(raw) => Self::from_json(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|_| StoreError::InvalidParameter("invalid calsvc.json"))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `CALSVC_*` overrides read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreError> {
        if let Some(raw) = lookup("CALSVC_BUSY_WINDOW_MS") {
            self.busy_window_ms = parse_env(&raw, "invalid CALSVC_BUSY_WINDOW_MS")?;
        }
        if let Some(raw) = lookup("CALSVC_COMMIT_ATTEMPTS") {
            self.commit_attempts = parse_env(&raw, "invalid CALSVC_COMMIT_ATTEMPTS")?;
        }
        if let Some(raw) = lookup("CALSVC_INSTANCE_HORIZON_DAYS") {
            self.instance_horizon_days = parse_env(&raw, "invalid CALSVC_INSTANCE_HORIZON_DAYS")?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.busy_poll_ms == 0 {
            return Err(StoreError::InvalidParameter("busy_poll_ms must be positive"));
        }
        if self.commit_attempts == 0 {
            return Err(StoreError::InvalidParameter("commit_attempts must be positive"));
        }
        if self.commit_backoff_initial_ms > self.commit_backoff_max_ms {
            return Err(StoreError::InvalidParameter(
                "commit_backoff_initial_ms exceeds commit_backoff_max_ms",
            ));
        }
        if self.max_instances_per_event == 0 {
            return Err(StoreError::InvalidParameter(
                "max_instances_per_event must be positive",
            ));
        }
        Ok(())
    }

    pub fn busy_window(&self) -> Duration {
        Duration::from_millis(self.busy_window_ms)
    }

    pub fn busy_poll(&self) -> Duration {
        Duration::from_millis(self.busy_poll_ms)
    }

    /// Delay before commit attempt `attempt` (0-based): doubling, capped.
    pub fn commit_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .commit_backoff_initial_ms
            .saturating_mul(factor)
            .min(self.commit_backoff_max_ms);
        Duration::from_millis(ms)
    }
}

fn parse_env<T: std::str::FromStr>(raw: &str, message: &'static str) -> Result<T, StoreError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| StoreError::InvalidParameter(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_defaults_and_env_overrides_json() {
        let config = StoreConfig::from_json(r#"{ "busy_window_ms": 50, "commit_attempts": 2 }"#)
            .expect("parse config");
        assert_eq!(config.busy_window_ms, 50);
        assert_eq!(config.commit_attempts, 2);
        assert_eq!(config.busy_poll_ms, 20);

        let config = config
            .with_overrides(|key| (key == "CALSVC_COMMIT_ATTEMPTS").then(|| "9".to_string()))
            .expect("apply env");
        assert_eq!(config.commit_attempts, 9);
        assert_eq!(config.busy_window_ms, 50);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            StoreConfig::from_json(r#"{ "unknown": 1 }"#),
            Err(StoreError::InvalidParameter(_))
        ));
        assert!(matches!(
            StoreConfig::default().with_overrides(|_| Some("zero".to_string())),
            Err(StoreError::InvalidParameter(_))
        ));
        assert!(matches!(
            StoreConfig::from_json(r#"{ "commit_attempts": 0 }"#),
            Err(StoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn commit_backoff_doubles_until_capped() {
        let config = StoreConfig::default();
        let delays: Vec<u64> = (0..7)
            .map(|attempt| config.commit_backoff(attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 80, 160, 320, 320]);
        assert_eq!(config.commit_backoff(80).as_millis(), 320);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "busy_poll_ms": 5 }"#)
            .expect("write config");
        let loaded = StoreConfig::load(dir.path()).expect("load config");
        assert_eq!(loaded.busy_poll_ms, 5);

        let empty = tempfile::tempdir().expect("temp dir");
        let loaded = StoreConfig::load(empty.path()).expect("load defaults");
        assert_eq!(loaded.instance_horizon_days, StoreConfig::default().instance_horizon_days);
    }
}
