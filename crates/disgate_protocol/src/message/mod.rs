//! # Message Dispatch
//!
//! Two dispatchers sit between the simulation and the wire:
//!
//! - [`OutgoingMessage`] turns local actor events into encoded PDUs and
//!   queues them in an [`OutboundBuffer`]
//! - [`IncomingMessage`] walks a received datagram PDU by PDU and turns each
//!   one into actor events
//!
//! Neither knows any PDU layout. They look up adaptors registered per tag
//! ([`LocalMessageType`] outbound, [`PduType`] inbound) and let those do the
//! conversion. The built-in adaptors live in [`crate::adaptors`]; plugins
//! register further ones during `start`.
//!
//! [`LocalMessageType`]: crate::events::LocalMessageType
//! [`PduType`]: crate::pdu::PduType

mod incoming;
mod outbound;
mod outgoing;
mod registry;
mod session;

pub use incoming::{IncomingMessage, ParseFailure, ProcessOutcome};
pub use outbound::{FlushPlan, MtuPolicy, OutboundBuffer, DEFAULT_MTU, MAX_DATAGRAM};
pub use outgoing::OutgoingMessage;
pub use registry::{AdaptorId, AdaptorRegistry};
pub use session::{DisSettings, NetworkSession};

use crate::events::ActorEvent;
use crate::pdu::Pdu;
use crate::simulation::SimulationHandle;

/// What an outgoing adaptor may consult while converting an event.
pub struct OutgoingContext<'a> {
    pub session: &'a mut NetworkSession,
    pub simulation: &'a dyn SimulationHandle,
}

/// Converts a local actor event into at most one PDU.
pub trait OutgoingAdaptor: Send + Sync {
    fn id(&self) -> AdaptorId;

    /// Returns `None` when the event should not produce traffic.
    fn convert(&self, event: &ActorEvent, ctx: &mut OutgoingContext<'_>) -> Option<Pdu>;
}

/// Converts a decoded PDU into actor events for the simulation.
pub trait IncomingAdaptor: Send + Sync {
    fn id(&self) -> AdaptorId;

    fn convert(&self, pdu: &Pdu, session: &mut NetworkSession) -> Vec<ActorEvent>;
}
