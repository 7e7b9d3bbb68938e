use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
/// Loaded from ~/.config/tinyswarm/tinyswarm.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Inventory file used when none is given on the command line.
    #[serde(default)]
    pub inventory: Option<PathBuf>,
    #[serde(default)]
    pub runners: RunnerSettings,
    #[serde(default)]
    pub defaults: Defaults,
}

/// Knobs for the concrete command runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// CLI used by the remote-exec runner (`<program> exec <vm> -- ...`).
    #[serde(default = "default_remote_program")]
    pub remote_program: String,
    /// Base URL that relative REST paths are joined to.
    #[serde(default)]
    pub rest_base_url: Option<String>,
    #[serde(default = "default_config_mgmt_program")]
    pub config_mgmt_program: String,
    #[serde(default)]
    pub config_mgmt_inventory: Option<String>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            remote_program: default_remote_program(),
            rest_base_url: None,
            config_mgmt_program: default_config_mgmt_program(),
            config_mgmt_inventory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Per-command timeout in seconds; 0 disables it.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Fail the build when the inventory does not hold exactly one manager.
    #[serde(default)]
    pub strict_manager: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
            strict_manager: false,
        }
    }
}

impl Defaults {
    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn default_remote_program() -> String {
    "multipass".to_string()
}

fn default_config_mgmt_program() -> String {
    "ansible".to_string()
}

fn default_command_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Load config from the default path, or defaults if there is none.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("tinyswarm")
            .join("tinyswarm.yaml")
    }
}
