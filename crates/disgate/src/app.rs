//! Main application logic and lifecycle management.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::signals::{setup_signal_handlers, setup_signal_handlers_silent, ShutdownState};
use disgate_protocol::{ActorRegistry, LocalMessageType};
use dispatch_server::{DispatchComponent, DispatchStats, UdpTransport};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often running totals are logged.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the in-process simulation and the dispatch component bridging it
/// onto the exercise.
pub struct Application {
    config: AppConfig,
    simulation: ActorRegistry,
    component: DispatchComponent<UdpTransport>,
}

impl Application {
    /// Loads configuration, applies CLI overrides, validates the result and
    /// builds the dispatch component.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        let plugin_safety_config = args.to_plugin_safety_config();

        if let Some(plugin_dir) = args.plugin_dir {
            config.plugins.directory = plugin_dir.to_string_lossy().to_string();
        }
        if let Some(address) = args.address {
            config.network.address = address;
        }
        if let Some(port) = args.port {
            config.network.port = port;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let dispatch_config = config.to_dispatch_config(plugin_safety_config);
        let transport = UdpTransport::new(dispatch_config.mtu, dispatch_config.on_mtu_exceeded);
        let component = DispatchComponent::new(dispatch_config, transport);

        Ok(Self { config, simulation: ActorRegistry::new(), component })
    }

    /// Attaches to the exercise, ticks until a shutdown signal arrives, then
    /// detaches.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        self.component.attach(&mut self.simulation).await?;

        let mut tick = tokio::time::interval(Duration::from_millis(self.config.network.tick_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats = tokio::time::interval(STATS_INTERVAL);
        stats.tick().await;

        info!("✅ Disgate is now running on {}:{}", self.config.network.address, self.config.network.port);
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let shutdown = setup_signal_handlers();
        tokio::pin!(shutdown);
        let mut last_stats = DispatchStats::default();

        let shutdown_state: ShutdownState = loop {
            tokio::select! {
                _ = tick.tick() => self.tick(),
                _ = stats.tick() => {
                    log_periodic_statistics(&last_stats, &self.component.stats(), self.simulation.len());
                    last_stats = self.component.stats();
                }
                result = &mut shutdown => break result?,
            }
        };

        // a second signal skips the graceful path
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("🔌 Leaving the exercise...");
        if let Err(e) = self.component.detach(&mut self.simulation).await {
            error!("❌ Detach failed: {}", e);
        }
        shutdown_state.complete_shutdown();

        log_final_statistics(&self.component.stats());
        info!("👋 Disgate shutdown complete");
        Ok(())
    }

    fn tick(&mut self) {
        for event in self.simulation.drain_outbox() {
            self.component.on_message(event);
        }

        let report = self.component.on_tick(&mut self.simulation);
        if !report.is_clean() {
            debug!(
                "Tick finished with {} dropped PDU(s), {} transport error(s), parse error: {}",
                report.dropped.len(),
                report.transport_errors.len(),
                report.parse_error.is_some()
            );
        }

        for event in self.simulation.take_received() {
            match event.kind {
                LocalMessageType::ActorCreated => {
                    let name = event.snapshot.as_ref().map(|s| s.name.as_str()).unwrap_or_default();
                    info!("➕ Network actor {} appeared as {}", event.actor_id, name);
                }
                LocalMessageType::ActorUpdated => debug!("Network actor {} updated", event.actor_id),
                LocalMessageType::ActorDeleted => info!("➖ Network actor {} removed", event.actor_id),
            }
        }
    }

    fn log_configuration_summary(&self) {
        let network = &self.config.network;
        info!("📋 Configuration Summary:");
        info!("  🌐 Exercise: {}:{} via {}", network.address, network.port, network.interface);
        info!("  🎯 Exercise id: {} | site {} | application {}", self.config.dis.exercise_id, self.config.dis.site_id, self.config.dis.application_id);
        info!("  📦 MTU: {} bytes, on overflow: {:?}", network.mtu, network.on_mtu_exceeded);
        info!("  ⏱️ Tick interval: {}ms", network.tick_interval_ms);
        if self.config.plugins.auto_load {
            info!("  🔌 Plugin directory: {}", self.config.plugins.directory);
        } else {
            info!("  🔌 Dynamic plugins disabled");
        }
        info!("  🗺️ {} actor type mapping(s)", self.config.mappings.len());
    }
}

fn log_periodic_statistics(previous: &DispatchStats, current: &DispatchStats, actors: usize) {
    info!(
        "📊 Bridge Health - {} datagrams out, {} in this period | {} actors known",
        current.datagrams_sent - previous.datagrams_sent,
        current.datagrams_received - previous.datagrams_received,
        actors
    );

    let parse_errors = current.parse_errors - previous.parse_errors;
    let dropped = current.pdus_dropped - previous.pdus_dropped;
    if parse_errors > 0 || dropped > 0 {
        warn!("⚠️ {} malformed datagram(s) and {} oversize PDU(s) this period", parse_errors, dropped);
    }
}

fn log_final_statistics(stats: &DispatchStats) {
    info!("📊 Final Statistics:");
    info!("  - Ticks: {}", stats.ticks);
    info!("  - Sent: {} datagrams, {} bytes", stats.datagrams_sent, stats.bytes_sent);
    info!("  - Received: {} datagrams, {} bytes", stats.datagrams_received, stats.bytes_received);
    info!("  - Events delivered to the simulation: {}", stats.events_delivered);
    info!("  - Parse errors: {} | dropped PDUs: {} | transport errors: {}", stats.parse_errors, stats.pdus_dropped, stats.transport_errors);
}
