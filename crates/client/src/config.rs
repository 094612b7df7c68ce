// Client configuration.
//
// User config: `<config dir>/quire/client.toml` (e.g. `~/.config/quire/client.toml`).
// `QUIRE_SERVER_URL` overrides the configured server.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::autosave::DebounceConfig;

pub const SERVER_URL_ENV: &str = "QUIRE_SERVER_URL";

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 800;

/// Path to the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quire").join("client.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the document service.
    pub server_url: String,
    /// Debounce window for autosave, clamped to 50..=10000.
    pub autosave_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
        }
    }
}

impl ClientConfig {
    /// Load the user config and apply environment overrides. A missing
    /// config file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(SERVER_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.server_url = url;
        }
        self
    }

    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig::with_millis(self.autosave_delay_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config `{}`: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.server_url, "http://127.0.0.1:3000");
        assert_eq!(cfg.debounce().window, Duration::from_millis(800));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "server_url = \"http://notes.local:8080\"\nautosave_delay_ms = 5\n")
            .unwrap();

        let cfg = ClientConfig::load_from(&path).unwrap();
        assert_eq!(cfg.server_url, "http://notes.local:8080");
        assert_eq!(cfg.debounce().window, Duration::from_millis(50));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "autosave_delay_ms = \"soon\"").unwrap();

        assert!(matches!(ClientConfig::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_override_replaces_server_url() {
        let cfg = ClientConfig::default().with_overrides(|key| {
            (key == SERVER_URL_ENV).then(|| "http://10.0.0.2:3000".to_owned())
        });
        assert_eq!(cfg.server_url, "http://10.0.0.2:3000");

        let cfg = ClientConfig::default().with_overrides(|_| Some("  ".to_owned()));
        assert_eq!(cfg.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn user_config_path_ends_with_client_toml() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("quire/client.toml"));
        }
    }
}
