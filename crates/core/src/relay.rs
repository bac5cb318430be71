//! Relay client boundary used for the mobile wallet.
//!
//! The relay is an opaque request/response capability; pairing, encryption
//! and delivery are its own business.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use pera_protocol::Network;
use serde::Serialize;
use serde_json::Value;

/// Method used to request signatures.
pub const SIGN_METHOD: &str = "algo_signTxn";

/// Reason reported to the wallet when the application disconnects.
pub const USER_DISCONNECTED: &str = "USER_DISCONNECTED";

/// Namespace key for Algorand.
pub const ALGORAND_NAMESPACE: &str = "algorand";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
	pub methods: Vec<String>,
	pub chains: Vec<String>,
	pub events: Vec<String>,
}

pub type Namespaces = BTreeMap<String, Namespace>;

/// Namespaces required when pairing with the mobile wallet.
pub fn algorand_namespaces(network: Network) -> Namespaces {
	let mut namespaces = Namespaces::new();
	namespaces.insert(
		ALGORAND_NAMESPACE.to_string(),
		Namespace {
			methods: vec![SIGN_METHOD.to_string()],
			chains: vec![network.relay_chain().to_string()],
			events: Vec::new(),
		},
	);
	namespaces
}

/// A session established through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySession {
	pub topic: String,
	/// Accounts as reported by the relay, usually `namespace:reference:address`.
	pub accounts: Vec<String>,
}

impl RelaySession {
	pub fn new(topic: impl Into<String>, accounts: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			topic: topic.into(),
			accounts: accounts.into_iter().map(Into::into).collect(),
		}
	}

	/// Bare addresses, without the chain prefix.
	pub fn addresses(&self) -> Vec<String> {
		self.accounts
			.iter()
			.map(|account| account.rsplit(':').next().unwrap_or(account).to_string())
			.collect()
	}
}

/// Resolves once the wallet approves the pairing.
pub type Approval = Pin<Box<dyn Future<Output = anyhow::Result<RelaySession>> + Send>>;

/// Pending pairing returned by [`RelayClient::connect`].
pub struct RelayPairing {
	/// Pairing URI to show as a QR code.
	pub uri: Option<String>,
	pub approval: Approval,
}

impl fmt::Debug for RelayPairing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RelayPairing").field("uri", &self.uri).finish_non_exhaustive()
	}
}

#[async_trait]
pub trait RelayClient: Send + Sync {
	/// Starts pairing for `namespaces`.
	async fn connect(&self, namespaces: &Namespaces) -> anyhow::Result<RelayPairing>;

	/// Sends a request over the session identified by `topic`.
	async fn request(&self, topic: &str, method: &str, params: Value, chain: &str) -> anyhow::Result<Value>;

	async fn disconnect(&self, topic: &str, reason: &str) -> anyhow::Result<()>;

	/// Sessions the relay client has persisted, oldest first.
	fn sessions(&self) -> Vec<RelaySession>;
}
