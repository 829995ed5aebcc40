use crate::error::{HatcheryError, Result};
use crate::worker::TenantId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deployer configuration with all settings for the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployerConfig {
    /// Root directory for all deployer data (records, workdirs, config sources)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the worker template (entry point + manifest)
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Unix socket the daemon listens on
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// First port handed out to a worker
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Maximum number of concurrently tracked instances
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,

    /// File name of the runnable entry point inside a workdir
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// File name of the dependency manifest copied from the template
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Run mode written into each worker's generated env file
    #[serde(default = "default_run_mode")]
    pub run_mode: String,

    /// Debounce window for config-change restarts (in milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Grace period between kill and respawn during a restart (in milliseconds)
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Poll interval of the config-file watcher (in milliseconds)
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    /// Poll interval of the structure guardian (in milliseconds)
    #[serde(default = "default_guardian_interval_ms")]
    pub guardian_interval_ms: u64,
}

// Default value functions for serde
fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp/hatchery")
}

fn default_template_dir() -> PathBuf {
    default_data_dir().join("template")
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/hatchery.sock")
}

fn default_base_port() -> u16 {
    5001
}

fn default_max_instances() -> usize {
    10
}

fn default_entry_point() -> String {
    "run.sh".to_string()
}

fn default_manifest() -> String {
    "manifest.json".to_string()
}

fn default_run_mode() -> String {
    "production".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_grace_ms() -> u64 {
    2000
}

fn default_watch_interval_ms() -> u64 {
    200
}

fn default_guardian_interval_ms() -> u64 {
    2000
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            template_dir: default_template_dir(),
            socket_path: default_socket_path(),
            base_port: default_base_port(),
            max_instances: default_max_instances(),
            entry_point: default_entry_point(),
            manifest: default_manifest(),
            run_mode: default_run_mode(),
            debounce_ms: default_debounce_ms(),
            grace_ms: default_grace_ms(),
            watch_interval_ms: default_watch_interval_ms(),
            guardian_interval_ms: default_guardian_interval_ms(),
        }
    }
}

impl DeployerConfig {
    /// Load the deployer configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<DeployerConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HatcheryError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        // Determine format based on file extension
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config: DeployerConfig = match extension {
            "toml" => toml::from_str(&contents).map_err(|e| {
                HatcheryError::InvalidConfig(format!("Failed to parse TOML: {}", e))
            })?,
            "json" => serde_json::from_str(&contents).map_err(|e| {
                HatcheryError::InvalidConfig(format!("Failed to parse JSON: {}", e))
            })?,
            _ => {
                return Err(HatcheryError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(HatcheryError::MissingConfigField("data_dir".to_string()));
        }

        if self.template_dir.as_os_str().is_empty() {
            return Err(HatcheryError::MissingConfigField(
                "template_dir".to_string(),
            ));
        }

        if self.max_instances == 0 {
            return Err(HatcheryError::ConfigValidationError(
                "max_instances must be at least 1".to_string(),
            ));
        }

        // Ports are handed out monotonically from base_port; the whole range
        // must fit in u16
        if self.base_port == 0 {
            return Err(HatcheryError::ConfigValidationError(
                "base_port must be nonzero".to_string(),
            ));
        }

        if self.base_port as usize + self.max_instances > u16::MAX as usize {
            return Err(HatcheryError::ConfigValidationError(format!(
                "base_port {} plus max_instances {} exceeds the port range",
                self.base_port, self.max_instances
            )));
        }

        // Entry point and manifest are file names looked up inside a workdir,
        // never paths
        for (field, value) in [("entry_point", &self.entry_point), ("manifest", &self.manifest)] {
            if value.is_empty() {
                return Err(HatcheryError::MissingConfigField(field.to_string()));
            }
            if value.contains('/') {
                return Err(HatcheryError::ConfigValidationError(format!(
                    "{} must be a bare file name, got: {}",
                    field, value
                )));
            }
        }

        if self.run_mode.is_empty() {
            return Err(HatcheryError::MissingConfigField("run_mode".to_string()));
        }

        Ok(())
    }

    /// Expand environment variables in path fields
    fn expand_env_vars(&mut self) {
        self.data_dir = Self::expand_env_in_path(&self.data_dir);
        self.template_dir = Self::expand_env_in_path(&self.template_dir);
        self.socket_path = Self::expand_env_in_path(&self.socket_path);
    }

    /// Expand environment variables in a string
    fn expand_env_in_string(s: &str) -> String {
        let mut result = s.to_string();

        // Handle $VAR and ${VAR} syntax
        for (key, value) in std::env::vars() {
            result = result.replace(&format!("${{{}}}", key), &value);
            result = result.replace(&format!("${}", key), &value);
        }

        result
    }

    /// Expand environment variables in a path
    fn expand_env_in_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = Self::expand_env_in_string(&path_str);
        PathBuf::from(expanded)
    }

    /// Path of the durable instance document
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("instances.json")
    }

    /// Directory holding all per-tenant workdirs
    pub fn workers_dir(&self) -> PathBuf {
        self.data_dir.join("workers")
    }

    /// Directory holding the per-tenant external config sources
    pub fn config_dir(&self) -> PathBuf {
        self.data_dir.join("config")
    }

    /// Workdir of a single tenant
    pub fn workdir(&self, tenant: &TenantId) -> PathBuf {
        self.workers_dir().join(tenant.as_str())
    }

    /// External config source watched for a single tenant
    pub fn config_source(&self, tenant: &TenantId) -> PathBuf {
        self.config_dir().join(format!("{}.env", tenant))
    }

    /// Directory roots the structure guardian keeps alive
    pub fn guarded_roots(&self) -> Vec<PathBuf> {
        vec![self.workers_dir(), self.config_dir()]
    }

    /// Get the restart debounce window as Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Get the kill-to-respawn grace period as Duration
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Get the watcher poll interval as Duration
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    /// Get the guardian poll interval as Duration
    pub fn guardian_interval(&self) -> Duration {
        Duration::from_millis(self.guardian_interval_ms)
    }
}
