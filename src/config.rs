//! Configuration for the update coordinator and host bridge.

use crate::error::{Result, UpdateError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default interval between scheduled checks (6 hours).
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 6 * 60 * 60 * 1000;

/// Top-level updater configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Human-facing releases page, e.g. `https://github.com/owner/project/releases`.
    ///
    /// `open-release` resolves `{release_base_url}/tag/v{version}` from it.
    pub release_base_url: String,
    /// Machine-readable feed describing the latest release (GitHub
    /// `releases/latest` API shape).
    pub release_feed_url: String,
    /// Interval between scheduled checks in milliseconds.
    pub check_interval_ms: u64,
    /// Version of the running application.
    pub current_version: String,
    /// Whether the gateway accepts `check` and `download` from the UI.
    pub allow_manual_operations: bool,
    /// HTTP timeout for release feed requests.
    pub request_timeout_secs: u64,
    /// Capacity of the gateway request queue.
    pub request_capacity: usize,
    /// Capacity of the host event broadcast channel.
    pub event_capacity: usize,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            release_base_url: "https://github.com/owner/project/releases".to_owned(),
            release_feed_url: "https://api.github.com/repos/owner/project/releases/latest"
                .to_owned(),
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            current_version: env!("CARGO_PKG_VERSION").to_owned(),
            allow_manual_operations: true,
            request_timeout_secs: 30,
            request_capacity: 64,
            event_capacity: 128,
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| UpdateError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpdateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/updraft/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("updraft").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("updraft")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/updraft-config/config.toml")
        }
    }

    /// Load the config at `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values the coordinator cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Config`] for a zero interval or unparseable URLs.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_ms == 0 {
            return Err(UpdateError::Config(
                "check_interval_ms must be greater than zero".to_owned(),
            ));
        }
        for (key, value) in [
            ("release_base_url", &self.release_base_url),
            ("release_feed_url", &self.release_feed_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| UpdateError::Config(format!("invalid {key} `{value}`: {e}")))?;
        }
        if semver::Version::parse(self.current_version.trim_start_matches('v')).is_err() {
            return Err(UpdateError::Config(format!(
                "current_version `{}` is not a semantic version",
                self.current_version
            )));
        }
        Ok(())
    }

    /// Scheduled check interval as a [`std::time::Duration`].
    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.check_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = UpdaterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval_ms, 21_600_000);
        assert!(config.allow_manual_operations);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = UpdaterConfig {
            release_base_url: "https://x/releases".to_owned(),
            check_interval_ms: 60_000,
            allow_manual_operations: false,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = UpdaterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.release_base_url, "https://x/releases");
        assert_eq!(loaded.check_interval_ms, 60_000);
        assert!(!loaded.allow_manual_operations);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: UpdaterConfig =
            toml::from_str(r#"release_base_url = "https://example.com/project/releases""#)
                .unwrap();
        assert_eq!(
            config.release_base_url,
            "https://example.com/project/releases"
        );
        assert_eq!(config.check_interval_ms, DEFAULT_CHECK_INTERVAL_MS);
        assert_eq!(config.request_capacity, 64);
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "check_interval_ms = \"soon\"").unwrap();
        assert!(matches!(
            UpdaterConfig::from_file(&path),
            Err(UpdateError::Config(_))
        ));
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = UpdaterConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.check_interval_ms, DEFAULT_CHECK_INTERVAL_MS);
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = UpdaterConfig {
            check_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let config = UpdaterConfig {
            release_base_url: "not a url".to_owned(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("release_base_url"));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = UpdaterConfig::default_config_path();
        assert!(path.ends_with("updraft/config.toml"));
    }
}
