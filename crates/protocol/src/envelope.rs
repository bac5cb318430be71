//! Envelope protocol between the application and a web wallet context.
//!
//! Every message is a JSON object tagged by `type`:
//!
//! 1. Application sends [`Envelope::Connect`] to the wallet frame or window
//! 2. Wallet may ask for [`Envelope::CreatePasscodeEmbedded`] (continue in a new tab)
//!    or [`Envelope::SelectAccountEmbedded`] (acknowledged with
//!    [`Envelope::SelectAccountEmbeddedCallback`])
//! 3. Wallet answers [`Envelope::ConnectCallback`] or [`Envelope::ConnectNetworkMismatch`]
//!
//! Signing follows the same shape with [`Envelope::SignTxn`] and its callbacks.
//! Target and origin are transport-level addressing and never appear in the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transaction::WalletTransaction;
use crate::types::{AppMeta, ChainId};

/// Message exchanged with the wallet context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
	/// Application asks the wallet to connect.
	Connect { data: ConnectData },
	/// Wallet approved the connection.
	ConnectCallback { data: ConnectCallbackData },
	/// Wallet is on a different network than the application.
	ConnectNetworkMismatch {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
	/// Wallet has no passcode yet and must continue in a separate tab.
	CreatePasscodeEmbedded,
	/// Wallet switched the embedded view to account selection.
	SelectAccountEmbedded,
	/// Application acknowledges the account selection view.
	SelectAccountEmbeddedCallback,
	/// Application asks the wallet to sign a flattened transaction group.
	SignTxn { txn: Vec<WalletTransaction> },
	/// Wallet returns the transactions it signed.
	SignTxnCallback {
		#[serde(rename = "signedTxns")]
		signed_txns: Vec<SignedTxn>,
	},
	/// Wallet refused to sign because of a network mismatch.
	SignTxnNetworkMismatch {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
	/// Wallet failed or declined to sign.
	SignTxnCallbackError {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
	/// Wallet no longer knows this application's session.
	SessionDisconnected {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
}

/// CONNECT payload: application metadata plus optional chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectData {
	#[serde(flatten)]
	pub meta: AppMeta,
	#[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<ChainId>,
}

/// CONNECT_CALLBACK payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectCallbackData {
	pub addresses: Vec<String>,
}

/// One signed transaction returned by the web wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTxn {
	/// Base64-encoded signed transaction.
	#[serde(rename = "signedTxn")]
	pub signed_txn: String,
}

impl Envelope {
	pub fn connect(meta: AppMeta, chain_id: Option<ChainId>) -> Self {
		Envelope::Connect {
			data: ConnectData { meta, chain_id },
		}
	}

	pub fn kind(&self) -> EnvelopeType {
		match self {
			Envelope::Connect { .. } => EnvelopeType::Connect,
			Envelope::ConnectCallback { .. } => EnvelopeType::ConnectCallback,
			Envelope::ConnectNetworkMismatch { .. } => EnvelopeType::ConnectNetworkMismatch,
			Envelope::CreatePasscodeEmbedded => EnvelopeType::CreatePasscodeEmbedded,
			Envelope::SelectAccountEmbedded => EnvelopeType::SelectAccountEmbedded,
			Envelope::SelectAccountEmbeddedCallback => EnvelopeType::SelectAccountEmbeddedCallback,
			Envelope::SignTxn { .. } => EnvelopeType::SignTxn,
			Envelope::SignTxnCallback { .. } => EnvelopeType::SignTxnCallback,
			Envelope::SignTxnNetworkMismatch { .. } => EnvelopeType::SignTxnNetworkMismatch,
			Envelope::SignTxnCallbackError { .. } => EnvelopeType::SignTxnCallbackError,
			Envelope::SessionDisconnected { .. } => EnvelopeType::SessionDisconnected,
		}
	}

	/// Error string carried by failure envelopes.
	pub fn error_message(&self) -> Option<&str> {
		match self {
			Envelope::ConnectNetworkMismatch { error }
			| Envelope::SignTxnNetworkMismatch { error }
			| Envelope::SignTxnCallbackError { error }
			| Envelope::SessionDisconnected { error } => error.as_deref(),
			_ => None,
		}
	}

	/// Returns true for types that end an exchange as a failure.
	pub fn is_failure(&self) -> bool {
		self.kind().is_failure()
	}
}

/// Fieldless mirror of [`Envelope`] used for expected-type matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EnvelopeType {
	Connect,
	ConnectCallback,
	ConnectNetworkMismatch,
	CreatePasscodeEmbedded,
	SelectAccountEmbedded,
	SelectAccountEmbeddedCallback,
	SignTxn,
	SignTxnCallback,
	SignTxnNetworkMismatch,
	SignTxnCallbackError,
	SessionDisconnected,
}

impl EnvelopeType {
	pub fn as_str(&self) -> &'static str {
		match self {
			EnvelopeType::Connect => "CONNECT",
			EnvelopeType::ConnectCallback => "CONNECT_CALLBACK",
			EnvelopeType::ConnectNetworkMismatch => "CONNECT_NETWORK_MISMATCH",
			EnvelopeType::CreatePasscodeEmbedded => "CREATE_PASSCODE_EMBEDDED",
			EnvelopeType::SelectAccountEmbedded => "SELECT_ACCOUNT_EMBEDDED",
			EnvelopeType::SelectAccountEmbeddedCallback => "SELECT_ACCOUNT_EMBEDDED_CALLBACK",
			EnvelopeType::SignTxn => "SIGN_TXN",
			EnvelopeType::SignTxnCallback => "SIGN_TXN_CALLBACK",
			EnvelopeType::SignTxnNetworkMismatch => "SIGN_TXN_NETWORK_MISMATCH",
			EnvelopeType::SignTxnCallbackError => "SIGN_TXN_CALLBACK_ERROR",
			EnvelopeType::SessionDisconnected => "SESSION_DISCONNECTED",
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(
			self,
			EnvelopeType::ConnectNetworkMismatch
				| EnvelopeType::SignTxnNetworkMismatch
				| EnvelopeType::SignTxnCallbackError
				| EnvelopeType::SessionDisconnected
		)
	}

	const fn bit(self) -> u16 {
		1 << (self as u8)
	}
}

/// Set of envelope types a pending exchange accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeSet(u16);

impl EnvelopeSet {
	pub const EMPTY: EnvelopeSet = EnvelopeSet(0);

	/// Replies that can end or advance a connect exchange.
	pub const CONNECT_REPLIES: EnvelopeSet = EnvelopeSet::of(&[
		EnvelopeType::ConnectCallback,
		EnvelopeType::ConnectNetworkMismatch,
		EnvelopeType::CreatePasscodeEmbedded,
		EnvelopeType::SelectAccountEmbedded,
	]);

	/// Replies that can end a sign exchange.
	pub const SIGN_REPLIES: EnvelopeSet = EnvelopeSet::of(&[
		EnvelopeType::SignTxnCallback,
		EnvelopeType::SignTxnNetworkMismatch,
		EnvelopeType::SignTxnCallbackError,
		EnvelopeType::SessionDisconnected,
	]);

	pub const fn of(types: &[EnvelopeType]) -> Self {
		let mut bits = 0;
		let mut i = 0;
		while i < types.len() {
			bits |= types[i].bit();
			i += 1;
		}
		EnvelopeSet(bits)
	}

	pub const fn with(self, ty: EnvelopeType) -> Self {
		EnvelopeSet(self.0 | ty.bit())
	}

	pub const fn without(self, ty: EnvelopeType) -> Self {
		EnvelopeSet(self.0 & !ty.bit())
	}

	pub const fn contains(&self, ty: EnvelopeType) -> bool {
		self.0 & ty.bit() != 0
	}

	pub const fn is_empty(&self) -> bool {
		self.0 == 0
	}
}

/// Inbound message as received from a transport.
///
/// Unknown or malformed types land in [`InboundFrame::Unknown`] so that late,
/// duplicate or foreign traffic is ignored rather than treated as an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
	Known(Envelope),
	Unknown(Value),
}
