//! Traffic logger plugin.
//!
//! Registers passive adaptors that log every PDU of the configured types
//! arriving from the exercise and every local actor event leaving for it.
//! The adaptors never produce events or PDUs themselves.
//!
//! Reads an optional `pdu_logger` table from the plugin settings:
//!
//! ```toml
//! [plugins.settings.pdu_logger]
//! pdu_types = [1, 2, 3]
//! log_outgoing = true
//! ```

use disgate_protocol::message::OutgoingContext;
use disgate_protocol::{
    export_plugin, ActorEvent, AdaptorId, IncomingAdaptor, LocalMessageType, NetworkPlugin, NetworkSession,
    OutgoingAdaptor, Pdu, PduType, PluginContext, PluginError,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

const INCOMING_ID: &str = "pdu_logger.incoming";
const OUTGOING_ID: &str = "pdu_logger.outgoing";

const LOCAL_KINDS: [LocalMessageType; 3] =
    [LocalMessageType::ActorCreated, LocalMessageType::ActorUpdated, LocalMessageType::ActorDeleted];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct LoggerSettings {
    pdu_types: Vec<u8>,
    log_outgoing: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            pdu_types: vec![
                PduType::ENTITY_STATE.0,
                PduType::FIRE.0,
                PduType::DETONATION.0,
                PduType::CREATE_ENTITY.0,
                PduType::REMOVE_ENTITY.0,
            ],
            log_outgoing: true,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    incoming: AtomicU64,
    outgoing: AtomicU64,
}

struct IncomingLogger {
    counters: Arc<Counters>,
}

impl IncomingAdaptor for IncomingLogger {
    fn id(&self) -> AdaptorId {
        AdaptorId::new(INCOMING_ID)
    }

    fn convert(&self, pdu: &Pdu, session: &mut NetworkSession) -> Vec<ActorEvent> {
        let seen = self.counters.incoming.fetch_add(1, Ordering::Relaxed) + 1;
        let header = pdu.header();
        match pdu {
            Pdu::EntityState(state) => {
                let known = session.identity().get_actor_by_entity_id(&state.entity_id).is_some();
                info!(
                    "📝 PduLogger: #{} {} from {} type {} '{}'{}",
                    seen,
                    pdu.pdu_type(),
                    state.entity_id,
                    state.entity_type,
                    state.marking.text(),
                    if known { "" } else { " (new)" }
                );
            }
            Pdu::CreateEntity(m) | Pdu::RemoveEntity(m) => {
                info!("📝 PduLogger: #{} {} from {} for {}", seen, pdu.pdu_type(), m.originating, m.receiving);
            }
            Pdu::Other(raw) => {
                info!(
                    "📝 PduLogger: #{} {} exercise {} ({} body bytes)",
                    seen,
                    pdu.pdu_type(),
                    header.exercise_id,
                    raw.body.len()
                );
            }
        }
        Vec::new()
    }
}

struct OutgoingLogger {
    counters: Arc<Counters>,
}

impl OutgoingAdaptor for OutgoingLogger {
    fn id(&self) -> AdaptorId {
        AdaptorId::new(OUTGOING_ID)
    }

    fn convert(&self, event: &ActorEvent, ctx: &mut OutgoingContext<'_>) -> Option<Pdu> {
        self.counters.outgoing.fetch_add(1, Ordering::Relaxed);
        let entity = ctx.session.identity().get_entity_id(&event.actor_id);
        match entity {
            Some(entity) => info!("📝 PduLogger: 📤 {} for {} ({})", event.kind, event.actor_id, entity),
            None => info!("📝 PduLogger: 📤 {} for {} (unpublished)", event.kind, event.actor_id),
        }
        None
    }
}

/// Logs exercise traffic in both directions.
pub struct PduLoggerPlugin {
    counters: Arc<Counters>,
    registered_types: Vec<PduType>,
    outgoing_registered: bool,
}

impl PduLoggerPlugin {
    pub fn new() -> Self {
        Self { counters: Arc::new(Counters::default()), registered_types: Vec::new(), outgoing_registered: false }
    }
}

impl Default for PduLoggerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPlugin for PduLoggerPlugin {
    fn name(&self) -> &str {
        "pdu_logger"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn start(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError> {
        let settings: LoggerSettings = ctx.shared.get_as("pdu_logger")?.unwrap_or_default();

        let incoming: Arc<dyn IncomingAdaptor> = Arc::new(IncomingLogger { counters: Arc::clone(&self.counters) });
        for pdu_type in settings.pdu_types.iter().copied().map(PduType) {
            if ctx.incoming.add_adaptor(pdu_type, Arc::clone(&incoming)) {
                self.registered_types.push(pdu_type);
            }
        }

        if settings.log_outgoing {
            let outgoing: Arc<dyn OutgoingAdaptor> = Arc::new(OutgoingLogger { counters: Arc::clone(&self.counters) });
            for kind in LOCAL_KINDS {
                ctx.outgoing.add_adaptor(kind, Arc::clone(&outgoing));
            }
            self.outgoing_registered = true;
        }

        info!(
            "📝 PduLogger: watching {} PDU type(s), outgoing logging {}",
            self.registered_types.len(),
            if self.outgoing_registered { "on" } else { "off" }
        );
        Ok(())
    }

    fn finish(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError> {
        let incoming_id = AdaptorId::new(INCOMING_ID);
        for pdu_type in self.registered_types.drain(..) {
            ctx.incoming.remove_adaptor(pdu_type, &incoming_id);
        }

        if std::mem::take(&mut self.outgoing_registered) {
            let outgoing_id = AdaptorId::new(OUTGOING_ID);
            for kind in LOCAL_KINDS {
                ctx.outgoing.remove_adaptor(kind, &outgoing_id);
            }
        }

        info!(
            "📝 PduLogger: logged {} incoming PDU(s) and {} outgoing event(s)",
            self.counters.incoming.load(Ordering::Relaxed),
            self.counters.outgoing.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

export_plugin!(PduLoggerPlugin, PduLoggerPlugin::new());

#[cfg(test)]
mod tests {
    use super::*;
    use disgate_protocol::pdu::{EntityManagementPdu, PduHeader, RawPdu};
    use disgate_protocol::{ActorRegistry, ByteOrder, DisSettings, EntityIdentifier, IncomingMessage, OutgoingMessage, SharedState};
    use serde_json::json;

    struct Host {
        incoming: IncomingMessage,
        outgoing: OutgoingMessage,
        sim: ActorRegistry,
        shared: SharedState,
    }

    impl Host {
        fn new(shared: SharedState) -> Self {
            Self { incoming: IncomingMessage::new(), outgoing: OutgoingMessage::new(1500), sim: ActorRegistry::new(), shared }
        }

        fn with<R>(&mut self, f: impl FnOnce(&mut PluginContext<'_>) -> R) -> R {
            let mut ctx = PluginContext {
                incoming: &mut self.incoming,
                outgoing: &mut self.outgoing,
                simulation: &self.sim,
                shared: &self.shared,
            };
            f(&mut ctx)
        }
    }

    #[test]
    fn test_registers_and_unregisters_everything() {
        let mut host = Host::new(SharedState::new());
        let mut plugin = PduLoggerPlugin::new();

        host.with(|ctx| plugin.start(ctx)).unwrap();
        assert_eq!(host.incoming.adaptor_count(), 5);
        assert_eq!(host.outgoing.adaptor_count(), 3);

        host.with(|ctx| plugin.finish(ctx)).unwrap();
        assert_eq!(host.incoming.adaptor_count(), 0);
        assert_eq!(host.outgoing.adaptor_count(), 0);
    }

    #[test]
    fn test_settings_narrow_what_is_logged() {
        let mut shared = SharedState::new();
        shared.insert("pdu_logger", json!({ "pdu_types": [2], "log_outgoing": false }));
        let mut host = Host::new(shared);
        let mut plugin = PduLoggerPlugin::new();

        host.with(|ctx| plugin.start(ctx)).unwrap();
        assert_eq!(host.incoming.adaptor_count(), 1);
        assert_eq!(host.outgoing.adaptor_count(), 0);
    }

    #[test]
    fn test_bad_settings_fail_start() {
        let mut shared = SharedState::new();
        shared.insert("pdu_logger", json!({ "pdu_types": "all" }));
        let mut host = Host::new(shared);

        let result = host.with(|ctx| PduLoggerPlugin::new().start(ctx));
        assert!(matches!(result, Err(PluginError::InvalidConfig(_))));
    }

    #[test]
    fn test_logging_produces_no_events() {
        let mut host = Host::new(SharedState::new());
        let mut plugin = PduLoggerPlugin::new();
        host.with(|ctx| plugin.start(ctx)).unwrap();

        let mut datagram = Pdu::Other(RawPdu {
            header: PduHeader::new(PduType::FIRE, disgate_protocol::pdu::family::WARFARE, 6, 1),
            body: vec![0; 84],
        })
        .encode(ByteOrder::Big)
        .unwrap();
        let remove = Pdu::RemoveEntity(EntityManagementPdu::remove(6, 1, EntityIdentifier::new(1, 2, 3), 9));
        datagram.extend(remove.encode(ByteOrder::Big).unwrap());

        let mut session = NetworkSession::new(DisSettings::default());
        let outcome = host.incoming.process(&datagram, &mut session);

        assert_eq!(outcome.decoded, 2);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.events.is_empty());
        assert_eq!(plugin.counters.incoming.load(Ordering::Relaxed), 2);
    }
}
