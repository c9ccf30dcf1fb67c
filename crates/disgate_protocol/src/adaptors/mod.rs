//! Adaptors for the PDU types the bridge understands natively.

mod builtin;
mod entity_state;
mod mappings;
mod remove_entity;

pub use builtin::BuiltinPduPlugin;
pub use entity_state::{EntityStateIncomingAdaptor, EntityStateOutgoingAdaptor};
pub use mappings::ActorTypeMappings;
pub use remove_entity::{RemoveEntityIncomingAdaptor, RemoveEntityOutgoingAdaptor};
