use crate::error::{CatalystError, Result};
use crate::providers::{BackendConfig, BackendType};
use content::User;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalystConfig {
    /// Where the database lives; the local app data dir when unset
    pub data_dir: Option<PathBuf>,

    /// Keep everything in memory, nothing touches disk
    pub in_memory: bool,

    pub backend: BackendConfig,

    /// Refresh interval while any item is generating
    pub poll_interval_secs: u64,

    pub max_items_per_request: usize,

    /// Single-tenant identity registered at startup
    pub user: Option<User>,
}

impl Default for CatalystConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            in_memory: false,
            backend: BackendConfig::default(),
            poll_interval_secs: 5,
            max_items_per_request: 5,
            user: Some(User {
                id: "user-123".to_string(),
                name: "Demo User".to_string(),
                email: "demo.user@example.com".to_string(),
            }),
        }
    }
}

impl CatalystConfig {
    /// Load configuration from JSON; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .map_err(|err| CatalystError::Config(format!("read {}: {err}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|err| CatalystError::Config(format!("parse {}: {err}", path.display())))
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| CatalystError::Config(err.to_string()))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|err| CatalystError::Config(err.to_string()))?;
        }
        std::fs::write(path, json)
            .map_err(|err| CatalystError::Config(format!("write {}: {err}", path.display())))
    }

    /// `load` followed by environment overrides
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `GEMINI_API_KEY`/`API_KEY`, `CATALYST_DATA_DIR` and `CATALYST_BACKEND`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.backend.api_key = Some(key);
        }
        if let Some(dir) = non_empty("CATALYST_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(kind) = non_empty("CATALYST_BACKEND") {
            self.backend.backend_type = kind.parse::<BackendType>()?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(content::app_data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("catalyst.db")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
