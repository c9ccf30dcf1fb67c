use crate::config::DispatchConfig;
use crate::error::{DispatchError, TransportError};
use crate::transport::{Transport, MAX_DATAGRAM};
use disgate_protocol::message::ParseFailure;
use disgate_protocol::{
    ActorEvent, ActorId, ActorTypeMappings, BuiltinPduPlugin, EntityIdentityMap, EventSource, IncomingMessage,
    NetworkSession, OutgoingMessage, PluginContext, SharedState, SimulationHandle,
};
use plugin_system::PluginRegistry;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`DispatchComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentState {
    /// Not part of a simulation; no socket, no plugins
    Detached,
    /// Plugins started and transport connected, no tick seen yet
    Attached,
    /// Ticking
    Running,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentState::Detached => "detached",
            ComponentState::Attached => "attached",
            ComponentState::Running => "running",
        };
        f.write_str(name)
    }
}

/// Counters accumulated since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub ticks: u64,
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub events_delivered: u64,
    pub pdus_queued: u64,
    pub pdus_dropped: u64,
    pub parse_errors: u64,
    pub transport_errors: u64,
}

/// What a single tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub bytes_received: usize,
    /// Events handed to the simulation
    pub events_delivered: usize,
    pub parse_error: Option<ParseFailure>,
    pub datagrams_sent: usize,
    pub bytes_sent: usize,
    /// Sizes of PDUs discarded for exceeding the MTU
    pub dropped: Vec<usize>,
    /// PDUs held back for a later tick
    pub deferred: usize,
    /// PDUs queued from the events observed this tick
    pub pdus_queued: usize,
    pub transport_errors: Vec<TransportError>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.parse_error.is_none() && self.dropped.is_empty() && self.transport_errors.is_empty()
    }
}

/// Tick-driven bridge between one simulation and one DIS exercise.
///
/// The component owns the identity map, both dispatchers and every plugin.
/// The simulation is passed into each lifecycle call rather than stored, so
/// the owner decides how the simulation itself is held.
pub struct DispatchComponent<T: Transport> {
    config: DispatchConfig,
    transport: T,
    session: NetworkSession,
    incoming: IncomingMessage,
    outgoing: OutgoingMessage,
    plugins: PluginRegistry,
    shared: SharedState,
    observed: Vec<ActorEvent>,
    receive_buffer: Vec<u8>,
    state: ComponentState,
    stats: DispatchStats,
}

impl<T: Transport> DispatchComponent<T> {
    pub fn new(config: DispatchConfig, transport: T) -> Self {
        let session = NetworkSession::new(config.dis.clone());
        let shared = SharedState::from(config.plugin_settings.clone());
        let outgoing = OutgoingMessage::new(config.mtu);
        let plugins = PluginRegistry::new(config.plugin_safety.clone());
        Self {
            config,
            transport,
            session,
            incoming: IncomingMessage::new(),
            outgoing,
            plugins,
            shared,
            observed: Vec::new(),
            receive_buffer: vec![0; MAX_DATAGRAM],
            state: ComponentState::Detached,
            stats: DispatchStats::default(),
        }
    }

    /// Starts the dispatchers and plugins, then connects the transport.
    ///
    /// Plugins that fail to load or start are skipped. A transport that
    /// fails to connect is fatal: the plugins are shut down again and the
    /// component stays detached.
    pub async fn attach(&mut self, sim: &mut dyn SimulationHandle) -> Result<(), DispatchError> {
        if self.state != ComponentState::Detached {
            return Err(DispatchError::InvalidState { operation: "attach", state: self.state });
        }

        info!("🚀 Attaching dispatch component to exercise {}", self.config.dis.exercise_id);

        self.session = NetworkSession::new(self.config.dis.clone());
        self.incoming = IncomingMessage::new();
        self.outgoing = OutgoingMessage::new(self.config.mtu);
        if self.transport.mtu() != self.config.mtu {
            warn!(
                "⚠️ Transport MTU of {} bytes differs from the configured {} bytes; batching uses the configured value",
                self.transport.mtu(),
                self.config.mtu
            );
        }
        let mut plugins = PluginRegistry::new(self.config.plugin_safety.clone());
        if let Some(whitelist) = &self.config.plugin_whitelist {
            plugins = plugins.with_whitelist(whitelist.clone());
        }
        self.plugins = plugins;

        let mappings = Arc::new(ActorTypeMappings::new(self.config.mappings.iter().cloned()));
        self.plugins.register_static(Box::new(BuiltinPduPlugin::new(mappings)))?;

        if let Some(directory) = &self.config.plugin_directory {
            if let Err(e) = self.plugins.load_plugins_from_directory(directory) {
                error!("❌ Failed to load plugins from {}: {}", directory.display(), e);
            }
        }

        let started = {
            let mut ctx = PluginContext {
                incoming: &mut self.incoming,
                outgoing: &mut self.outgoing,
                simulation: &*sim,
                shared: &self.shared,
            };
            self.plugins.start_all(&mut ctx)
        };
        info!(
            "🔌 {} plugin(s) started, {} incoming and {} outgoing adaptor(s) registered",
            started,
            self.incoming.adaptor_count(),
            self.outgoing.adaptor_count()
        );

        if let Err(e) = self.transport.connect(&self.config.endpoint).await {
            error!("❌ Transport failed to connect to {}: {}", self.config.endpoint.target(), e);
            self.shutdown_plugins(sim);
            return Err(DispatchError::Transport(e));
        }

        self.state = ComponentState::Attached;
        info!("✅ Dispatch component attached to {}", self.config.endpoint.target());
        Ok(())
    }

    /// Records a local actor event to publish on the next tick.
    pub fn on_message(&mut self, event: ActorEvent) {
        if self.state == ComponentState::Detached {
            debug!("Ignoring {} for {} while detached", event.kind, event.actor_id);
            return;
        }
        self.observed.push(event);
    }

    /// Runs one network cycle.
    ///
    /// 1. Reads at most one datagram and delivers the events it produces.
    /// 2. Sends what earlier ticks queued, per the configured MTU policy.
    /// 3. Converts the local events observed since the previous tick; their
    ///    PDUs go out on the next tick.
    pub fn on_tick(&mut self, sim: &mut dyn SimulationHandle) -> TickReport {
        let mut report = TickReport::default();
        match self.state {
            ComponentState::Detached => {
                debug!("Tick ignored while detached");
                return report;
            }
            ComponentState::Attached => {
                info!("▶️ Dispatch component running");
                self.state = ComponentState::Running;
            }
            ComponentState::Running => {}
        }
        self.stats.ticks += 1;

        self.receive(sim, &mut report);
        self.flush(&mut report);

        for event in std::mem::take(&mut self.observed) {
            report.pdus_queued += self.outgoing.handle(&event, &mut self.session, &*sim);
        }
        self.stats.pdus_queued += report.pdus_queued as u64;

        report
    }

    fn receive(&mut self, sim: &mut dyn SimulationHandle, report: &mut TickReport) {
        let len = match self.transport.receive(&mut self.receive_buffer) {
            Ok(0) => return,
            Ok(len) => len,
            Err(e) => {
                warn!("⚠️ Receive failed: {}", e);
                self.stats.transport_errors += 1;
                report.transport_errors.push(e);
                return;
            }
        };

        report.bytes_received = len;
        self.stats.datagrams_received += 1;
        self.stats.bytes_received += len as u64;

        let outcome = self.incoming.process(&self.receive_buffer[..len], &mut self.session);
        if outcome.parse_error.is_some() {
            self.stats.parse_errors += 1;
        }
        report.parse_error = outcome.parse_error;

        for event in outcome.events {
            sim.send_message(event);
            report.events_delivered += 1;
        }
        self.stats.events_delivered += report.events_delivered as u64;
    }

    fn flush(&mut self, report: &mut TickReport) {
        let plan = self.outgoing.take_datagrams(self.config.on_mtu_exceeded);
        report.deferred = plan.deferred;
        report.dropped = plan.dropped;
        self.stats.pdus_dropped += report.dropped.len() as u64;

        for datagram in &plan.datagrams {
            match self.transport.send(datagram) {
                Ok(sent) => {
                    report.datagrams_sent += 1;
                    report.bytes_sent += sent;
                    self.stats.datagrams_sent += 1;
                    self.stats.bytes_sent += sent as u64;
                }
                Err(e) => {
                    warn!("⚠️ Send of {} byte datagram failed: {}", datagram.len(), e);
                    self.stats.transport_errors += 1;
                    report.transport_errors.push(e);
                }
            }
        }
    }

    /// Leaves the exercise.
    ///
    /// Actors mirrored from the network are deleted from the simulation,
    /// plugins are finished and unloaded, the identity map is cleared and
    /// the transport disconnected. Detaching a detached component does
    /// nothing.
    pub async fn detach(&mut self, sim: &mut dyn SimulationHandle) -> Result<(), DispatchError> {
        if self.state == ComponentState::Detached {
            return Ok(());
        }

        info!("🛑 Detaching dispatch component");

        let mirrored: Vec<ActorId> = self.session.remote_actors().copied().collect();
        for actor in &mirrored {
            sim.send_message(ActorEvent::deleted(*actor, EventSource::Network));
        }
        if !mirrored.is_empty() {
            info!("🧹 Removed {} network actor(s) from the simulation", mirrored.len());
        }

        self.shutdown_plugins(sim);
        self.state = ComponentState::Detached;

        self.transport.disconnect().await?;
        info!("✅ Dispatch component detached");
        Ok(())
    }

    fn shutdown_plugins(&mut self, sim: &mut dyn SimulationHandle) {
        {
            let mut ctx = PluginContext {
                incoming: &mut self.incoming,
                outgoing: &mut self.outgoing,
                simulation: &*sim,
                shared: &self.shared,
            };
            self.plugins.unload_all_plugins(&mut ctx);
        }

        // anything a plugin forgot to unregister goes too
        self.incoming.clear_adaptors();
        self.outgoing.clear_adaptors();
        self.outgoing.clear_data();
        self.observed.clear();
        self.session.reset();
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn identity_map(&self) -> &EntityIdentityMap {
        self.session.identity()
    }

    pub fn session(&self) -> &NetworkSession {
        &self.session
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl<T: Transport> fmt::Debug for DispatchComponent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchComponent")
            .field("state", &self.state)
            .field("endpoint", &self.config.endpoint)
            .field("bindings", &self.session.identity().len())
            .field("plugins", &self.plugins)
            .field("stats", &self.stats)
            .finish()
    }
}
