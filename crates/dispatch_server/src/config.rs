//! Dispatch component configuration.

use crate::transport::Endpoint;
use disgate_protocol::{DisSettings, MtuPolicy, ObjectTypeBinding, DEFAULT_MTU};
use plugin_system::PluginSafetyConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Everything a [`DispatchComponent`](crate::DispatchComponent) needs to
/// attach to an exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Where datagrams are sent and received
    pub endpoint: Endpoint,

    /// Largest datagram payload considered safe on the path
    pub mtu: usize,

    /// What to do when queued traffic does not fit one datagram
    pub on_mtu_exceeded: MtuPolicy,

    pub dis: DisSettings,

    /// Directory scanned for plugin libraries (`None` disables dynamic plugins)
    pub plugin_directory: Option<PathBuf>,

    /// Library names allowed to load from the plugin directory
    pub plugin_whitelist: Option<Vec<String>>,

    pub plugin_safety: PluginSafetyConfig,

    /// Actor type to DIS entity type table used by the built-in adaptors
    pub mappings: Vec<ObjectTypeBinding>,

    /// Settings handed to plugins through their start context
    pub plugin_settings: Map<String, Value>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            mtu: DEFAULT_MTU,
            on_mtu_exceeded: MtuPolicy::default(),
            dis: DisSettings::default(),
            plugin_directory: None,
            plugin_whitelist: None,
            plugin_safety: PluginSafetyConfig::default(),
            mappings: Vec::new(),
            plugin_settings: Map::new(),
        }
    }
}
