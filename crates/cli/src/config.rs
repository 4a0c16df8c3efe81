use anyhow::{Context, Result};
use fremen_core::loader::EngineConfig;
use fremen_core::storage::FilesystemStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Limits applied to behavior scripts
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,

    #[serde(default = "default_behaviors_dir")]
    pub behaviors_dir: String,
}

fn default_workflows_dir() -> String {
    "workflows".to_string()
}

fn default_behaviors_dir() -> String {
    "behaviors".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            workflows_dir: default_workflows_dir(),
            behaviors_dir: default_behaviors_dir(),
        }
    }
}

impl CliConfig {
    pub fn load(config_path: &Path, data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        // Load config file if it exists, otherwise use defaults
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self {
                data_dir: data_dir.clone(),
                storage: Default::default(),
                engine: Default::default(),
            }
        };

        config.data_dir = data_dir;

        Ok(config)
    }

    /// Get the workflow definitions path
    pub fn workflows_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.workflows_dir)
    }

    /// Get the behavior sources path
    pub fn behaviors_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.behaviors_dir)
    }

    pub fn open_store(&self) -> Result<FilesystemStore> {
        FilesystemStore::new(self.workflows_path(), self.behaviors_path())
            .context("Failed to open definition store")
    }
}
