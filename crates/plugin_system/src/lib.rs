//! Plugin system for loading and managing network plugins.
//!
//! A [`PluginRegistry`] owns every plugin of one dispatch component. Plugins
//! are either linked statically into the host or discovered as dynamic
//! libraries exporting the `export_plugin!` symbols. The registry validates
//! the ABI version, starts plugins with panic isolation and tears them down
//! in reverse registration order.

mod error;
mod manager;

pub use error::PluginSystemError;
pub use manager::{discover_plugin_files, PluginHandle, PluginRegistry, PluginSafetyConfig, PluginSource};

/// Re-export commonly used types for plugin development
pub use disgate_protocol::{NetworkPlugin, PluginContext, PluginError};
pub use libloading::Library;
