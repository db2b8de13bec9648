use crate::core::path::{config_file, ensure_dir};
use crate::core::{RudderError, RudderResult};
use crate::deploy::Driver;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `component.secret`
pub const COMPONENT_SECRET_ENV: &str = "RUDDER_COMPONENT_SECRET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Namespace every plugin is deployed into
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Where deployed releases are kept
    #[serde(default)]
    pub driver: Driver,

    /// Repository record store (defaults to the platform data directory)
    ///
    /// Default locations:
    /// - Windows: %APPDATA%\rudder\data\state
    /// - Linux: ~/.local/share/rudder/state
    /// - macOS: ~/Library/Application Support/rudder/state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,

    /// Root of the filesystem driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_dir: Option<String>,

    /// Chart archive cache (defaults to the platform cache directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    /// Seconds between polls of the record store
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,

    /// Deadline for every HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub component: ComponentConfig,
}

/// The platform component chart attached to every plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    #[serde(default = "default_component_repo_url")]
    pub repo_url: String,

    #[serde(default = "default_component_chart_name")]
    pub chart_name: String,

    #[serde(default = "default_component_secret")]
    pub secret: String,
}

fn default_namespace() -> String {
    "keel-system".to_string()
}

fn default_watch_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_component_repo_url() -> String {
    "https://tkeel-io.github.io/helm-charts".to_string()
}

fn default_component_chart_name() -> String {
    "tkeel-plugin-components".to_string()
}

fn default_component_secret() -> String {
    "changeme".to_string()
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            repo_url: default_component_repo_url(),
            chart_name: default_component_chart_name(),
            secret: default_component_secret(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            driver: Driver::default(),
            state_dir: None,
            deploy_dir: None,
            cache_dir: None,
            watch_interval_secs: default_watch_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            component: ComponentConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the platform-specific config directory, creating
    /// the default if it doesn't exist
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\rudder\config.yaml
    /// - Linux: ~/.config/rudder/config.yaml
    /// - macOS: ~/Library/Application Support/rudder/config.yaml
    pub fn load() -> RudderResult<Self> {
        Self::load_from(&config_file()?)
    }

    /// Load config from `path`, creating the default there if absent
    pub fn load_from(path: &Path) -> RudderResult<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)
                .map_err(|e| RudderError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        if let Ok(secret) = std::env::var(COMPONENT_SECRET_ENV) {
            if !secret.is_empty() {
                config.component.secret = secret;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> RudderResult<()> {
        self.save_to(&config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> RudderResult<()> {
        let config_dir = path
            .parent()
            .ok_or_else(|| RudderError::Path("Invalid config path".to_string()))?;
        ensure_dir(config_dir)?;

        let content = serde_yaml::to_string(self)
            .map_err(|e| RudderError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> RudderResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(RudderError::Config("namespace must not be empty".to_string()));
        }
        if self.watch_interval_secs == 0 {
            return Err(RudderError::Config(
                "watch_interval_secs must be positive".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(RudderError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.component.chart_name.is_empty() {
            return Err(RudderError::Config(
                "component.chart_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn state_dir(&self) -> RudderResult<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => crate::core::path::state_dir(),
        }
    }

    pub fn deploy_dir(&self) -> RudderResult<PathBuf> {
        match &self.deploy_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => crate::core::path::deploy_dir(),
        }
    }

    pub fn cache_dir(&self) -> RudderResult<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => crate::core::path::cache_dir(),
        }
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
