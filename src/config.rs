// Configuration: optional YAML file plus defaults

use crate::backend::{BackendKind, StorageBackend, open_backend, validate_key};
use crate::store::{DEFAULT_STORAGE_KEY, TaskStore};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "todostore";
const CONFIG_FILE: &str = "config.yaml";

/// Runtime configuration
///
/// ```yaml
/// data_dir: /home/me/.local/share/todostore
/// backend: sqlite
/// storage_key: todo-storage
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the backend keeps its files; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
    pub backend: BackendKind,
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend: BackendKind::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Config {
    /// `{config_dir}/todostore/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// present, and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(file = ?path, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw)?;
        validate_key(&config.storage_key)?;
        Ok(config)
    }

    /// The configured data dir, or `{data_dir}/todostore`
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or_else(|| eyre!("Could not determine a data directory; set data_dir in the config")),
        }
    }

    /// Open the configured backend and load the store from it
    pub fn open_store(&self) -> Result<TaskStore<Box<dyn StorageBackend>>> {
        let dir = self.resolved_data_dir()?;
        let backend = open_backend(self.backend, &dir)?;
        TaskStore::open_with_key(backend, self.storage_key.clone())
    }
}
