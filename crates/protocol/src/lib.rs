//! Wire types for the Pera Connect envelope protocol.
//!
//! This crate only describes what travels between the application and the
//! wallet context; it performs no I/O.
//!
//! # Main Types
//!
//! - [`Envelope`] - Typed messages exchanged with an embedded or popped-out wallet
//! - [`EnvelopeType`] / [`EnvelopeSet`] - Type tags used for expected-response filtering
//! - [`SignerTransaction`] / [`WalletTransaction`] - Caller input and its wire-ready form
//! - [`Network`], [`WalletVariant`], [`AppMeta`] - Shared session vocabulary

pub mod envelope;
pub mod error;
pub mod transaction;
pub mod types;

pub use envelope::{
	ConnectCallbackData, ConnectData, Envelope, EnvelopeSet, EnvelopeType, InboundFrame, SignedTxn,
};
pub use error::{Error, Result};
pub use transaction::{
	MultisigMetadata, SignatureEntry, SignerTransaction, WalletTransaction, decode_base64,
	decode_signature_entries, encode_base64, to_wallet_transactions,
};
pub use types::{AppMeta, ChainId, Network, WalletVariant};
