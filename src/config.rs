use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::alerts::DEFAULT_HISTORY_LIMIT;
use crate::error::{FusionError, FusionResult};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_alert_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: default_alert_dir(),
            history_limit: default_history_limit(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_alert_dir() -> PathBuf {
    PathBuf::from("data/alerts")
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_bus_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load `.env`, then the YAML file named by `FUSION_CONFIG` (or `config.yaml`),
    /// then apply environment overrides. A missing file yields defaults.
    pub fn load() -> FusionResult<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("FUSION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::from_yaml("{}")?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> FusionResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| FusionError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> FusionResult<Self> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let config: AppConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> FusionResult<()> {
        if let Ok(host) = std::env::var("FUSION_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FUSION_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| FusionError::Config(format!("FUSION_PORT is not a port: {}", port)))?;
        }
        if let Ok(dir) = std::env::var("FUSION_ALERT_DIR") {
            self.alerts.dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("FUSION_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> FusionResult<()> {
        if self.alerts.history_limit == 0 {
            return Err(FusionError::Config("alerts.history_limit must be > 0".to_string()));
        }
        if self.alerts.bus_capacity == 0 {
            return Err(FusionError::Config("alerts.bus_capacity must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
