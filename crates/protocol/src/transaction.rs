//! Transaction descriptors and their wire-ready signing-request form.
//!
//! The caller hands over [`SignerTransaction`] groups; the engine flattens them
//! into [`WalletTransaction`] items with [`to_wallet_transactions`]. That step
//! is pure and leaves the caller's input untouched.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Multisig parameters attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigMetadata {
	pub version: u8,
	pub threshold: u8,
	pub addrs: Vec<String>,
}

/// One unsigned transaction as supplied by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerTransaction {
	/// Encoded unsigned transaction body.
	pub txn: Vec<u8>,
	/// Addresses allowed to sign; `None` leaves the choice to the wallet.
	pub signers: Option<Vec<String>>,
	/// Authorized address when the sender is rekeyed.
	pub auth_addr: Option<String>,
	pub msig: Option<MultisigMetadata>,
	/// Message shown to the user next to this transaction.
	pub message: Option<String>,
}

impl SignerTransaction {
	pub fn new(txn: impl Into<Vec<u8>>) -> Self {
		Self {
			txn: txn.into(),
			..Default::default()
		}
	}

	pub fn with_signers<I, S>(mut self, signers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.signers = Some(signers.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_auth_addr(mut self, auth_addr: impl Into<String>) -> Self {
		self.auth_addr = Some(auth_addr.into());
		self
	}

	pub fn with_msig(mut self, msig: MultisigMetadata) -> Self {
		self.msig = Some(msig);
		self
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}

/// Wire-ready signing-request item.
///
/// An empty `signers` list tells the wallet not to sign this item with the
/// connected identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
	/// Base64-encoded unsigned transaction body.
	pub txn: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signers: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auth_addr: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub msig: Option<MultisigMetadata>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl WalletTransaction {
	/// Builds the wire item for `tx`, applying the optional signer filter.
	pub fn from_signer_transaction(tx: &SignerTransaction, signer: Option<&str>) -> Self {
		let excluded = signer.is_some_and(|address| {
			!tx.signers
				.as_deref()
				.unwrap_or_default()
				.iter()
				.any(|allowed| allowed == address)
		});

		Self {
			txn: encode_base64(&tx.txn),
			signers: if excluded { Some(Vec::new()) } else { tx.signers.clone() },
			auth_addr: tx.auth_addr.clone(),
			msig: tx.msig.clone(),
			message: tx.message.clone(),
		}
	}

	/// Decodes the transaction body back to bytes.
	pub fn decode_txn(&self) -> Result<Vec<u8>> {
		decode_base64(&self.txn)
	}
}

/// Flattens transaction groups into signing-request items, preserving order.
pub fn to_wallet_transactions(groups: &[Vec<SignerTransaction>], signer: Option<&str>) -> Vec<WalletTransaction> {
	groups
		.iter()
		.flatten()
		.map(|tx| WalletTransaction::from_signer_transaction(tx, signer))
		.collect()
}

/// One entry of a relay signing response.
///
/// Wallets answer either with base64 strings or with raw byte arrays.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SignatureEntry {
	Base64(String),
	Bytes(Vec<u8>),
}

impl SignatureEntry {
	pub fn into_bytes(self) -> Result<Vec<u8>> {
		match self {
			SignatureEntry::Base64(encoded) => decode_base64(&encoded),
			SignatureEntry::Bytes(bytes) => Ok(bytes),
		}
	}
}

/// Drops the entries the wallet declined to sign (`null`) and decodes the rest.
pub fn decode_signature_entries(entries: Vec<Option<SignatureEntry>>) -> Result<Vec<Vec<u8>>> {
	entries.into_iter().flatten().map(SignatureEntry::into_bytes).collect()
}

pub fn encode_base64(bytes: &[u8]) -> String {
	STANDARD.encode(bytes)
}

pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
	Ok(STANDARD.decode(encoded)?)
}
