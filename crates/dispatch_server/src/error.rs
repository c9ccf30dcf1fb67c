//! Error types for the dispatch layer.
//!
//! Only the lifecycle transitions surface these to the caller. Errors met
//! while ticking are logged and counted in the tick report instead.

use crate::dispatch::ComponentState;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Only raised when the MTU policy forbids oversize datagrams
    #[error("Datagram of {len} bytes exceeds MTU of {mtu} bytes")]
    DatagramTooLarge { len: usize, mtu: usize },

    #[error("Network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection refused: {0}")]
    Refused(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] plugin_system::PluginSystemError),

    #[error("Cannot {operation} while {state}")]
    InvalidState { operation: &'static str, state: ComponentState },
}
