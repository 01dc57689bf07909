//! Network Configuration
//!
//! Optional TOML configuration for the router and logging, with environment
//! overrides:
//! - `HVAC_ROUTER_IP`: router address in CIDR notation
//! - `HVAC_BACNET_PORT`: BACnet/IP UDP port (default: 47808)
//! - `HVAC_ROUTER_DEVICE_ID`: router device instance (default: 999)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::router::{RouterOptions, DEFAULT_BACNET_PORT, DEFAULT_ROUTER_DEVICE_ID, DEFAULT_ROUTER_NAME};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub router: RouterSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// `[router]` section. The router is only configured when an address is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSettings {
    pub ip_address: Option<String>,
    #[serde(default = "default_bacnet_port")]
    pub bacnet_port: u16,
    #[serde(default = "default_router_device_id")]
    pub device_id: u32,
    #[serde(default = "default_router_name")]
    pub device_name: String,
}

fn default_bacnet_port() -> u16 {
    DEFAULT_BACNET_PORT
}

fn default_router_device_id() -> u32 {
    DEFAULT_ROUTER_DEVICE_ID
}

fn default_router_name() -> String {
    DEFAULT_ROUTER_NAME.to_string()
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            ip_address: None,
            bacnet_port: default_bacnet_port(),
            device_id: default_router_device_id(),
            device_name: default_router_name(),
        }
    }
}

impl RouterSettings {
    /// Router options, if an address is configured.
    pub fn options(&self) -> Option<RouterOptions> {
        self.ip_address.as_ref().map(|ip| RouterOptions {
            ip_address: ip.clone(),
            bacnet_port: self.bacnet_port,
            device_id: self.device_id,
            device_name: self.device_name.clone(),
        })
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

impl NetworkConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::PathNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ip) = lookup("HVAC_ROUTER_IP") {
            debug!("Router address overridden from environment");
            self.router.ip_address = Some(ip);
        }

        if let Some(port) = lookup("HVAC_BACNET_PORT").and_then(|s| s.parse().ok()) {
            self.router.bacnet_port = port;
        }

        if let Some(id) = lookup("HVAC_ROUTER_DEVICE_ID").and_then(|s| s.parse().ok()) {
            self.router.device_id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::from_toml("").unwrap();
        assert_eq!(config, NetworkConfig::default());
        assert_eq!(config.router.bacnet_port, 47808);
        assert_eq!(config.router.device_id, 999);
        assert_eq!(config.router.device_name, "BACnet-Router");
        assert!(config.router.options().is_none());
    }

    #[test]
    fn test_parse_router_section() {
        let config = NetworkConfig::from_toml(
            r#"
[router]
ip_address = "10.88.0.32/16"
bacnet_port = 47809

[logging]
filter = "hvac_network=debug"
"#,
        )
        .unwrap();

        let options = config.router.options().unwrap();
        assert_eq!(options.ip_address, "10.88.0.32/16");
        assert_eq!(options.bacnet_port, 47809);
        assert_eq!(options.device_id, 999);
        assert_eq!(config.logging.filter.as_deref(), Some("hvac_network=debug"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("HVAC_ROUTER_IP", "192.168.1.10/24"),
            ("HVAC_BACNET_PORT", "not-a-port"),
            ("HVAC_ROUTER_DEVICE_ID", "4194"),
        ]
        .into_iter()
        .collect();

        let mut config = NetworkConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.router.ip_address.as_deref(), Some("192.168.1.10/24"));
        assert_eq!(config.router.bacnet_port, 47808);
        assert_eq!(config.router.device_id, 4194);
    }

    #[tokio::test]
    async fn test_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("network.toml");
        fs::write(&path, "[router]\ndevice_name = \"Edge-Router\"\n")
            .await
            .unwrap();

        let config = NetworkConfig::load(&path).await.unwrap();
        assert_eq!(config.router.device_name, "Edge-Router");

        assert!(matches!(
            NetworkConfig::load(dir.path().join("missing.toml")).await,
            Err(ConfigError::PathNotFound(_))
        ));

        fs::write(&path, "[router\n").await.unwrap();
        assert!(matches!(
            NetworkConfig::load(&path).await,
            Err(ConfigError::ParseError(_))
        ));
    }
}
