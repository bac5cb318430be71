//! Pera Runtime - Transports, dispatch and liveness tracking
//!
//! This crate provides the cross-context plumbing between an application and
//! the Pera web wallet:
//!
//! - **Transport**: Embedded frame or popped window, chosen by host capability
//! - **Teller**: Envelope posting, the single live listener and origin filtering
//! - **Watchdog**: Detects a popped window closed by the user
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ pera-connect │  Session machine, connect and sign flows
//! └──────┬───────┘
//!        │ exchange / deliver
//! ┌──────▼───────┐
//! │ pera-runtime │  This crate
//! │  ┌────────┐  │
//! │  │ Teller │  │  Envelope correlation
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Frame / window contexts
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Watch  │  │  Liveness polling
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! # Decoupling via BrowsingHost
//!
//! Frames and windows are created by the embedding environment through the
//! [`BrowsingHost`] and [`TargetContext`] traits, so the runtime has no
//! dependency on any particular browser binding.

pub mod error;
pub mod teller;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod watchdog;

pub use error::{Error, Result};
pub use teller::{InboundMessage, Listener, PendingExchange, Teller};
pub use transport::{
	BrowsingHost, ChannelTransport, HostCapability, MountPoint, Origin, TargetContext, TransportGuard,
	TransportKind, embedded_url, select_transport,
};
pub use watchdog::{DEFAULT_POLL_INTERVAL, Watchdog};
