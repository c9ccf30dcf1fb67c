use super::entity_state::{EntityStateIncomingAdaptor, EntityStateOutgoingAdaptor};
use super::mappings::ActorTypeMappings;
use super::remove_entity::{RemoveEntityIncomingAdaptor, RemoveEntityOutgoingAdaptor};
use crate::events::LocalMessageType;
use crate::message::{AdaptorId, IncomingAdaptor, OutgoingAdaptor};
use crate::pdu::PduType;
use crate::plugin::{NetworkPlugin, PluginContext, PluginError};
use std::sync::Arc;
use tracing::info;

/// The statically linked plugin carrying the native PDU set: Entity State
/// and Remove Entity in both directions.
pub struct BuiltinPduPlugin {
    mappings: Arc<ActorTypeMappings>,
}

impl BuiltinPduPlugin {
    pub const NAME: &'static str = "builtin_pdus";

    pub fn new(mappings: Arc<ActorTypeMappings>) -> Self {
        Self { mappings }
    }
}

impl NetworkPlugin for BuiltinPduPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn start(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError> {
        let state_out: Arc<dyn OutgoingAdaptor> = Arc::new(EntityStateOutgoingAdaptor::new(Arc::clone(&self.mappings)));
        ctx.outgoing.add_adaptor(LocalMessageType::ActorCreated, Arc::clone(&state_out));
        ctx.outgoing.add_adaptor(LocalMessageType::ActorUpdated, state_out);
        ctx.outgoing.add_adaptor(LocalMessageType::ActorDeleted, Arc::new(RemoveEntityOutgoingAdaptor));

        let state_in: Arc<dyn IncomingAdaptor> = Arc::new(EntityStateIncomingAdaptor::new(Arc::clone(&self.mappings)));
        ctx.incoming.add_adaptor(PduType::ENTITY_STATE, state_in);
        ctx.incoming.add_adaptor(PduType::REMOVE_ENTITY, Arc::new(RemoveEntityIncomingAdaptor));

        info!("🧩 Built-in PDU adaptors registered ({} type mappings)", self.mappings.len());
        Ok(())
    }

    fn finish(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), PluginError> {
        let state_out = AdaptorId::new(EntityStateOutgoingAdaptor::ID);
        ctx.outgoing.remove_adaptor(LocalMessageType::ActorCreated, &state_out);
        ctx.outgoing.remove_adaptor(LocalMessageType::ActorUpdated, &state_out);
        ctx.outgoing.remove_adaptor(LocalMessageType::ActorDeleted, &AdaptorId::new(RemoveEntityOutgoingAdaptor::ID));

        ctx.incoming.remove_adaptor(PduType::ENTITY_STATE, &AdaptorId::new(EntityStateIncomingAdaptor::ID));
        ctx.incoming.remove_adaptor(PduType::REMOVE_ENTITY, &AdaptorId::new(RemoveEntityIncomingAdaptor::ID));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{IncomingMessage, OutgoingMessage};
    use crate::plugin::SharedState;
    use crate::simulation::ActorRegistry;

    #[test]
    fn test_start_and_finish_are_symmetric() {
        let mut incoming = IncomingMessage::new();
        let mut outgoing = OutgoingMessage::new(1500);
        let sim = ActorRegistry::new();
        let shared = SharedState::new();
        let mut plugin = BuiltinPduPlugin::new(Arc::new(ActorTypeMappings::default()));

        let mut ctx = PluginContext { incoming: &mut incoming, outgoing: &mut outgoing, simulation: &sim, shared: &shared };
        plugin.start(&mut ctx).unwrap();
        // starting twice does not duplicate registrations
        plugin.start(&mut ctx).unwrap();
        assert_eq!(ctx.outgoing.adaptor_count(), 3);
        assert_eq!(ctx.incoming.adaptor_count(), 2);

        plugin.finish(&mut ctx).unwrap();
        assert_eq!(ctx.outgoing.adaptor_count(), 0);
        assert_eq!(ctx.incoming.adaptor_count(), 0);
    }
}
