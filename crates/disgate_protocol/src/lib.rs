//! # Disgate Protocol
//!
//! Identity correlation and PDU dispatch for bridging a local simulation
//! onto a DIS exercise.
//!
//! ## Core Features
//!
//! - **Identity Map**: 1:1 correlation of actor ids, wire handles, DIS entity
//!   identifiers and object names, with all-or-nothing insertion
//! - **PDU Codec**: Entity State, Create Entity and Remove Entity in either
//!   byte order, with every other PDU type carried raw
//! - **Adaptor Dispatch**: outgoing and incoming converters registered per
//!   message tag under explicit ids
//! - **MTU Batching**: outbound PDUs packed into datagrams under a selectable
//!   overflow policy
//! - **Plugins**: a C ABI entry point for dynamically loaded adaptor sets
//!
//! ## Quick Start Example
//!
//! ```rust
//! use disgate_protocol::*;
//! use std::sync::Arc;
//!
//! let mappings = Arc::new(ActorTypeMappings::new([ObjectTypeBinding {
//!     object_class: "BaseEntity.PhysicalEntity.Platform.GroundVehicle".to_string(),
//!     actor_type: ActorType::new("vehicles", "tank"),
//!     entity_type: Some("1.1.225.1".parse().unwrap()),
//! }]));
//!
//! let mut session = NetworkSession::new(DisSettings::default());
//! let mut incoming = IncomingMessage::new();
//! let mut outgoing = OutgoingMessage::new(DEFAULT_MTU);
//! let mut sim = ActorRegistry::new();
//!
//! let mut builtin = BuiltinPduPlugin::new(mappings);
//! let shared = SharedState::new();
//! let mut ctx = PluginContext { incoming: &mut incoming, outgoing: &mut outgoing, simulation: &sim, shared: &shared };
//! builtin.start(&mut ctx).unwrap();
//!
//! sim.spawn_local("T1", ActorType::new("vehicles", "tank"), EntityState::default());
//! for event in sim.drain_outbox() {
//!     outgoing.handle(&event, &mut session, &sim);
//! }
//!
//! let plan = outgoing.take_datagrams(MtuPolicy::SendAnyway);
//! assert_eq!(plan.datagrams.len(), 1);
//! assert_eq!(session.identity().len(), 1);
//! ```

pub mod adaptors;
pub mod events;
pub mod identity;
mod macros;
pub mod message;
pub mod pdu;
pub mod plugin;
pub mod simulation;
pub mod types;

pub use adaptors::{ActorTypeMappings, BuiltinPduPlugin};
pub use events::{ActorEvent, ActorSnapshot, EntityState, EventSource, LocalMessageType};
pub use identity::{EntityIdentityMap, IdentityBinding};
pub use message::{
    AdaptorId, DisSettings, FlushPlan, IncomingAdaptor, IncomingMessage, MtuPolicy, NetworkSession, OutgoingAdaptor,
    OutgoingContext, OutgoingMessage, ProcessOutcome, DEFAULT_MTU, MAX_DATAGRAM,
};
pub use pdu::{ByteOrder, CodecError, Pdu, PduType};
pub use plugin::{NetworkPlugin, PluginContext, PluginError, SharedState};
pub use simulation::{ActorRegistry, SimulationHandle};
pub use types::{ActorId, ActorType, EntityIdentifier, EntityType, ObjectTypeBinding, WireObjectHandle};

/// ABI version for plugin compatibility validation.
///
/// Format: `crate_version:rustc_version`, e.g. `0.3.0:1.75.0` or
/// `0.3.0:unknown` when the build could not detect the compiler.
pub const ABI_VERSION: &str = {
    const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");
    const RUST_VERSION: &str = env!("DISGATE_RUSTC_VERSION");
    const_format::concatcp!(CRATE_VERSION, ":", RUST_VERSION)
};

/// [`ABI_VERSION`] with a trailing NUL, handed across the plugin boundary.
#[doc(hidden)]
pub const ABI_VERSION_NUL: &str = const_format::concatcp!(ABI_VERSION, "\0");

/// Returns a build info string naming the crate and compiler versions.
pub fn build_info() -> String {
    format!(
        "Disgate protocol v{} built with Rust {}",
        env!("CARGO_PKG_VERSION"),
        env!("DISGATE_RUSTC_VERSION")
    )
}
