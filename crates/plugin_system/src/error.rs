//! Error types for the plugin system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginSystemError {
    #[error("Plugin loading error: {0}")]
    LoadingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Library loading error: {0}")]
    LibraryError(String),

    #[error("Plugin already exists: {0}")]
    PluginAlreadyExists(String),

    #[error("Plugin version mismatch: {0}")]
    VersionMismatch(String),
}
