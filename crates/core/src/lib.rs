//! pera: Connect applications to the Pera wallet
//!
//! This crate provides the connection and signing engine. It negotiates a
//! session with either the mobile wallet (through a relay client) or the web
//! wallet (through an embedded frame or a popped-out window), keeps that
//! session persisted across reloads and requests transaction signatures.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use pera::{Collaborators, ConnectOptions, ConnectRequest, PeraWalletConnect, SignerTransaction};
//!
//! async fn run(collaborators: Collaborators, unsigned: Vec<u8>) -> pera::Result<()> {
//!     let options = ConnectOptions::new("project-id").with_sign_txn_toast(false);
//!     let pera = PeraWalletConnect::new(options, collaborators)?;
//!
//!     let accounts = match pera.reconnect_session().await? {
//!         accounts if !accounts.is_empty() => accounts,
//!         _ => pera.connect(ConnectRequest::default()).await?,
//!     };
//!
//!     let group = vec![SignerTransaction::new(unsigned).with_signers([accounts[0].clone()])];
//!     let signed = pera.sign_transaction(&[group], Some(&accounts[0])).await?;
//!     assert_eq!(signed.len(), 1);
//!
//!     pera.disconnect().await
//! }
//! ```
//!
//! # Collaborators
//!
//! Rendering, storage, remote configuration and the relay client are supplied
//! by the application through [`Collaborators`]. The host must also forward
//! every inbound cross-context message to [`PeraWalletConnect::deliver`].

pub mod config;
mod connect;
pub mod engine;
pub mod error;
pub mod relay;
pub mod session;
pub mod sign;
pub mod store;
pub mod surface;

pub use config::{ConfigLookup, ConnectOptions, RemoteConfig, StaticConfigLookup, WebWalletUrls};
pub use engine::{Collaborators, ConnectRequest, PeraWalletConnect};
pub use error::{CancelCause, Error, ErrorKind, Result};
pub use relay::{Namespace, Namespaces, RelayClient, RelayPairing, RelaySession, algorand_namespaces};
pub use session::{Session, SessionMachine, SessionPhase};
pub use sign::build_sign_request;
pub use store::{JsonFileSessionStore, MemorySessionStore, SessionStore};
pub use surface::{ConnectView, Surface, SurfaceEvent, SurfaceGuard, SurfaceHandle, SurfaceKind, SurfaceParams};

pub use pera_protocol::{AppMeta, ChainId, MultisigMetadata, Network, SignerTransaction, WalletTransaction, WalletVariant};
pub use pera_runtime::{BrowsingHost, HostCapability, InboundMessage, MountPoint, TargetContext, Teller};
