// Server configuration.
//
// Sources, later wins:
//   1. built-in defaults
//   2. `quire.toml` in the working directory, or the file named by `QUIRE_CONFIG`
//   3. `QUIRE_LISTEN_ADDR` / `QUIRE_DATABASE_PATH` environment variables

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "QUIRE_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "QUIRE_LISTEN_ADDR";
pub const DATABASE_PATH_ENV: &str = "QUIRE_DATABASE_PATH";

const DEFAULT_CONFIG_FILE: &str = "quire.toml";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_PATH: &str = "data/markdown.db";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub listen_addr: String,
    /// SQLite database file; parent directories are created on open.
    pub database_path: PathBuf,
    /// Browser origins allowed to call the API cross-origin. Empty disables CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Resolve configuration from file and process environment.
    ///
    /// A missing default config file is not an error; a missing file named
    /// explicitly through `QUIRE_CONFIG` is.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from(Path::new(&path))?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply environment-style overrides from `lookup`. Blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(addr) = get(LISTEN_ADDR_ENV) {
            self.listen_addr = addr;
        }
        if let Some(path) = get(DATABASE_PATH_ENV) {
            self.database_path = PathBuf::from(path);
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config `{}`: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}
