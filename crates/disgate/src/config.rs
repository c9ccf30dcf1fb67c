//! Configuration management for the disgate bridge.
//!
//! This module handles loading, validation, and conversion of the bridge
//! configuration from TOML files and command-line arguments.

use disgate_protocol::{ActorType, DisSettings, MtuPolicy, ObjectTypeBinding, DEFAULT_MTU};
use dispatch_server::{DispatchConfig, Endpoint, DEFAULT_DIS_PORT};
use plugin_system::PluginSafetyConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use tracing::info;

fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_mtu() -> usize {
    DEFAULT_MTU
}

fn default_port() -> u16 {
    DEFAULT_DIS_PORT
}

fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}

fn default_interface() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub network: NetworkSettings,
    #[serde(default)]
    pub dis: DisSettings,
    pub plugins: PluginSettings,
    pub logging: LoggingSettings,
    /// Actor type to DIS entity type table
    #[serde(default)]
    pub mappings: Vec<ObjectTypeBinding>,
}

/// Transport and tick settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Exercise address: unicast, broadcast or a multicast group
    #[serde(default = "default_address")]
    pub address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interface to bind and to join multicast groups on
    #[serde(default = "default_interface")]
    pub interface: Ipv4Addr,
    #[serde(default)]
    pub multicast_loopback: bool,
    #[serde(default = "default_mtu")]
    pub mtu: usize,
    /// `send_anyway`, `reject` or `fragment`
    #[serde(default)]
    pub on_mtu_exceeded: MtuPolicy,
    /// Dispatch tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Directory path where plugin files are located
    pub directory: String,
    /// Whether to load plugins from the directory on startup
    pub auto_load: bool,
    /// Plugin whitelist - if non-empty, only these plugins will be loaded
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Free-form values handed to plugins on start
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            interface: default_interface(),
            multicast_loopback: false,
            mtu: default_mtu(),
            on_mtu_exceeded: MtuPolicy::default(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkSettings::default(),
            dis: DisSettings::default(),
            plugins: PluginSettings {
                directory: "plugins".to_string(),
                auto_load: true,
                whitelist: vec![],
                settings: Map::new(),
            },
            logging: LoggingSettings { level: "info".to_string(), json_format: false },
            mappings: vec![
                ObjectTypeBinding {
                    object_class: "BaseEntity.PhysicalEntity.Platform.GroundVehicle".to_string(),
                    actor_type: ActorType::new("vehicles", "tank"),
                    entity_type: "1.1.225.1".parse().ok(),
                },
                ObjectTypeBinding {
                    object_class: "BaseEntity.PhysicalEntity.Platform.Aircraft".to_string(),
                    actor_type: ActorType::new("vehicles", "jet"),
                    entity_type: "1.2.225".parse().ok(),
                },
            ],
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a dispatch component configuration.
    pub fn to_dispatch_config(&self, plugin_safety: PluginSafetyConfig) -> DispatchConfig {
        let plugin_directory = self.plugins.auto_load.then(|| PathBuf::from(&self.plugins.directory));
        let plugin_whitelist = (!self.plugins.whitelist.is_empty()).then(|| self.plugins.whitelist.clone());

        DispatchConfig {
            endpoint: Endpoint {
                address: self.network.address,
                port: self.network.port,
                interface: self.network.interface,
                multicast_loopback: self.network.multicast_loopback,
            },
            mtu: self.network.mtu,
            on_mtu_exceeded: self.network.on_mtu_exceeded,
            dis: self.dis.clone(),
            plugin_directory,
            plugin_whitelist,
            plugin_safety,
            mappings: self.mappings.clone(),
            plugin_settings: self.plugins.settings.clone(),
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.network.port == 0 {
            return Err("Network port cannot be 0".to_string());
        }

        // smallest datagram able to hold one Entity State PDU
        if self.network.mtu < 144 {
            return Err(format!("MTU of {} bytes cannot hold an Entity State PDU", self.network.mtu));
        }

        if self.network.tick_interval_ms == 0 {
            return Err("Tick interval must be greater than 0".to_string());
        }

        if self.plugins.auto_load && self.plugins.directory.is_empty() {
            return Err("Plugin directory cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        for (index, mapping) in self.mappings.iter().enumerate() {
            if mapping.object_class.is_empty() {
                return Err(format!("Mapping {} has an empty object_class", index));
            }
            let duplicate = self.mappings[..index].iter().any(|m| m.actor_type == mapping.actor_type);
            if duplicate {
                return Err(format!("Actor type {} is mapped more than once", mapping.actor_type));
            }
        }

        Ok(())
    }
}
