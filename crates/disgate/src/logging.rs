//! Logging system setup.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. JSON output is
/// used when either the configuration or the CLI asks for it.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false).with_thread_names(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_file(false).with_line_number(false).with_target(false))
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the startup banner.
pub fn display_banner() {
    info!("╔══════════════════════════════════════════╗");
    info!("║              📡 DISGATE 📡               ║");
    info!("║                  v{:<23}║", env!("CARGO_PKG_VERSION"));
    info!("║                                          ║");
    info!("║  DIS entity bridge                       ║");
    info!("║  🔗 Identity correlation                 ║");
    info!("║  📦 MTU-aware PDU batching               ║");
    info!("║  🔌 Pluggable PDU adaptors               ║");
    info!("╚══════════════════════════════════════════╝");
    info!("{}", disgate_protocol::build_info());
}
