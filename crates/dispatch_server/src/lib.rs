//! # Dispatch Server
//!
//! Runs the DIS bridge for one simulation: a [`DispatchComponent`] owning
//! the plugins, dispatchers and identity map, driven tick by tick over a
//! [`Transport`].
//!
//! ## Lifecycle
//!
//! ```text
//! Detached --attach--> Attached --first tick--> Running --detach--> Detached
//! ```
//!
//! Only `attach` and `detach` return errors. Problems met while ticking
//! (malformed PDUs, failed sends, oversize PDUs) are logged and reported in
//! the [`TickReport`] so the simulation loop never stops on network noise.
//!
//! ## Example
//!
//! ```rust
//! use dispatch_server::{DispatchComponent, DispatchConfig, MemoryNetwork};
//! use disgate_protocol::ActorRegistry;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//! let mut sim = ActorRegistry::new();
//! let mut component = DispatchComponent::new(DispatchConfig::default(), network.transport());
//!
//! component.attach(&mut sim).await?;
//! let report = component.on_tick(&mut sim);
//! assert_eq!(report.bytes_sent, 0);
//! component.detach(&mut sim).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod transport;

pub use config::DispatchConfig;
pub use dispatch::{ComponentState, DispatchComponent, DispatchStats, TickReport};
pub use error::{DispatchError, TransportError};
pub use transport::{Endpoint, MemoryNetwork, MemoryTransport, Transport, UdpTransport, DEFAULT_DIS_PORT};
