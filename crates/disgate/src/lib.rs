//! # Disgate - DIS Bridge Entry Point
//!
//! Joins a DIS exercise and mirrors it into an in-process simulation. This
//! entry point handles CLI parsing, configuration loading and application
//! lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (broadcast on port 3000)
//! disgate
//!
//! # Specify custom configuration
//! disgate --config exercise.toml
//!
//! # Join a multicast exercise with a custom plugin directory
//! disgate --address 239.1.2.3 --port 3001 --plugins /opt/disgate/plugins --log-level debug
//!
//! # JSON logging for production
//! disgate --json-logs
//! ```
//!
//! ## Configuration
//!
//! The bridge loads configuration from a TOML file (default: `disgate.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM (Ctrl+C on Windows) detach the dispatch component,
//! which removes network actors from the simulation and unloads plugins
//! before the process exits. A second signal exits immediately.

use tracing::error;

mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, NetworkSettings, PluginSettings};

/// Runs the bridge until shutdown.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // logging settings come from the file, so read it before anything logs
    let config = AppConfig::load_from_file(&args.config_path).await.unwrap_or_default();

    let mut logging = config.logging.clone();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_system::PluginSafetyConfig;

    #[test]
    fn test_default_config_converts() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let dispatch = config.to_dispatch_config(PluginSafetyConfig::default());
        assert_eq!(dispatch.mtu, 1500);
        assert_eq!(dispatch.endpoint.port, 3000);
        assert_eq!(dispatch.mappings.len(), 2);
    }

    #[tokio::test]
    async fn test_application_creation_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("disgate.toml");
        let args = CliArgs::try_parse_from([
            "disgate",
            "--config",
            config_path.to_str().unwrap(),
            "--port",
            "3005",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let app = Application::new(args).await;
        assert!(app.is_ok());
        assert!(config_path.exists());
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("disgate.toml");
        let args = CliArgs::try_parse_from([
            "disgate",
            "--config",
            config_path.to_str().unwrap(),
            "--log-level",
            "chatty",
        ])
        .unwrap();

        assert!(Application::new(args).await.is_err());
    }
}
