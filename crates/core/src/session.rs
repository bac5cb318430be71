//! Session record and its lifecycle.
//!
//! [`SessionMachine`] is the single owner of the current [`Session`]: every
//! read and write goes through it, and it keeps the persisted copy in the
//! [`SessionStore`] in step with the in-memory one.
//!
//! ```text
//! idle ──begin_connect──► connecting ──complete_connect──► connected
//!  ▲  ▲                        │                            │    │
//!  │  └──────fail_connect──────┘                            │    │
//!  └───────────────────────clear────────────────────────────┘    │
//!                                                     mark_disconnected
//!                                                                ▼
//!                       connecting ◄──begin_connect──── disconnected
//! ```

use std::sync::Arc;

use pera_protocol::{ChainId, Network, WalletVariant};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::relay::RelaySession;
use crate::store::SessionStore;

/// An established wallet session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// Relay topic; only set for [`WalletVariant::RelayMobile`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic: Option<String>,
	#[serde(rename = "type")]
	pub variant: WalletVariant,
	pub accounts: Vec<String>,
	#[serde(default)]
	pub network: Network,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<ChainId>,
}

impl Session {
	/// Creates a session, dropping duplicate accounts while keeping order.
	pub fn new(variant: WalletVariant, accounts: impl IntoIterator<Item = String>, network: Network) -> Self {
		let mut unique: Vec<String> = Vec::new();
		for account in accounts {
			if !unique.contains(&account) {
				unique.push(account);
			}
		}

		Self {
			topic: None,
			variant,
			accounts: unique,
			network,
			chain_id: None,
		}
	}

	/// Session adopted from the relay client.
	pub fn relay(relay: &RelaySession, network: Network) -> Self {
		Self::new(WalletVariant::RelayMobile, relay.addresses(), network).with_topic(relay.topic.clone())
	}

	pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
		self.topic = Some(topic.into());
		self
	}

	pub fn with_chain_id(mut self, chain_id: Option<ChainId>) -> Self {
		self.chain_id = chain_id;
		self
	}

	pub fn platform(&self) -> &'static str {
		self.variant.platform()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Idle,
	Connecting,
	Connected,
	Disconnected,
}

/// Authoritative session state.
pub struct SessionMachine {
	phase: SessionPhase,
	session: Option<Session>,
	store: Arc<dyn SessionStore>,
}

impl SessionMachine {
	/// Loads whatever session `store` holds.
	pub fn load(store: Arc<dyn SessionStore>) -> Result<Self> {
		let session = store.get()?;
		let phase = match &session {
			Some(session) if !session.accounts.is_empty() => SessionPhase::Connected,
			_ => SessionPhase::Idle,
		};
		debug!(?phase, "Session state loaded");

		Ok(Self { phase, session, store })
	}

	pub fn phase(&self) -> SessionPhase {
		self.phase
	}

	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	pub fn accounts(&self) -> Vec<String> {
		self.session
			.as_ref()
			.map(|session| session.accounts.clone())
			.unwrap_or_default()
	}

	pub fn is_connected(&self) -> bool {
		self.session.as_ref().is_some_and(|session| !session.accounts.is_empty())
	}

	/// Enters `connecting`. Callers clear a connected session first.
	pub fn begin_connect(&mut self) {
		debug!(from = ?self.phase, "Connect started");
		self.phase = SessionPhase::Connecting;
	}

	/// Persists `session` and enters `connected`.
	pub fn complete_connect(&mut self, session: Session) -> Result<Vec<String>> {
		self.store.set(&session)?;
		info!(
			variant = session.platform(),
			accounts = session.accounts.len(),
			network = %session.network,
			"Session connected"
		);

		let accounts = session.accounts.clone();
		self.session = Some(session);
		self.phase = SessionPhase::Connected;
		Ok(accounts)
	}

	/// Abandons a connect attempt; nothing is persisted.
	pub fn fail_connect(&mut self) {
		if self.phase == SessionPhase::Connecting {
			self.phase = SessionPhase::Idle;
		}
	}

	/// Adopts a session found outside an explicit connect.
	pub fn adopt(&mut self, session: Session) -> Result<()> {
		self.store.set(&session)?;
		info!(variant = session.platform(), accounts = session.accounts.len(), "Session restored");
		self.session = Some(session);
		self.phase = SessionPhase::Connected;
		Ok(())
	}

	/// Drops the session and its persisted copy, back to `idle`. Safe to call
	/// repeatedly.
	pub fn clear(&mut self) -> Result<()> {
		self.reset(SessionPhase::Idle)
	}

	/// Drops a session the wallet no longer recognises and enters
	/// `disconnected`.
	pub fn mark_disconnected(&mut self) -> Result<()> {
		self.reset(SessionPhase::Disconnected)
	}

	/// In-memory state is reset even when the store fails.
	fn reset(&mut self, phase: SessionPhase) -> Result<()> {
		if self.session.take().is_some() {
			info!(?phase, "Session cleared");
		}
		self.phase = phase;
		self.store.clear()
	}
}
