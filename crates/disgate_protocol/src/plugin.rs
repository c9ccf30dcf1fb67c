//! # Plugin Interface
//!
//! A plugin contributes adaptors to the two dispatchers. It is handed both
//! of them in [`NetworkPlugin::start`] and is expected to remove what it
//! added in [`NetworkPlugin::finish`].
//!
//! Plugins are either linked statically (the built-in PDU set is one) or
//! loaded from a dynamic library exporting the symbols generated by
//! [`export_plugin!`](crate::export_plugin).

use crate::message::{IncomingMessage, OutgoingMessage};
use crate::simulation::SimulationHandle;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("Plugin start failed: {0}")]
    StartFailed(String),
    #[error("Plugin finish failed: {0}")]
    FinishFailed(String),
    #[error("Invalid plugin configuration: {0}")]
    InvalidConfig(String),
    /// A panic caught at the plugin boundary
    #[error("Plugin runtime error: {0}")]
    Runtime(String),
}

impl PluginError {
    /// Converts a caught panic payload into an error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("plugin panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("plugin panicked: {}", s)
        } else {
            "plugin panicked with unknown payload".to_string()
        };
        PluginError::Runtime(message)
    }
}

/// Host-provided key/value settings plugins may read during start.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    values: Map<String, Value>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserializes the value stored under `key`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PluginError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| PluginError::InvalidConfig(format!("{}: {}", key, e))),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for SharedState {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// Everything a plugin may touch during `start` and `finish`.
pub struct PluginContext<'a> {
    pub incoming: &'a mut IncomingMessage,
    pub outgoing: &'a mut OutgoingMessage,
    pub simulation: &'a dyn SimulationHandle,
    pub shared: &'a SharedState,
}

pub trait NetworkPlugin: Send {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Registers the plugin's adaptors.
    fn start(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError>;

    /// Unregisters whatever `start` registered.
    fn finish(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError>;
}
