//! # Dispatch Component
//!
//! The tick-driven orchestrator. Each tick polls the transport once, runs
//! inbound bytes through [`IncomingMessage`](disgate_protocol::IncomingMessage),
//! flushes the outbound buffer and converts the local events observed since
//! the previous tick.

mod component;

pub use component::{ComponentState, DispatchComponent, DispatchStats, TickReport};
