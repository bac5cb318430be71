//! The public engine.

use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use pera_protocol::{Network, WalletVariant};
use pera_runtime::{BrowsingHost, InboundMessage, Teller};
use tracing::{debug, info, warn};

use crate::config::{ConfigLookup, ConnectOptions};
use crate::error::Result;
use crate::relay::{RelayClient, USER_DISCONNECTED};
use crate::session::{Session, SessionMachine, SessionPhase};
use crate::store::SessionStore;
use crate::surface::Surface;
use crate::Error;

/// Services the engine depends on, provided by the embedding application.
#[derive(Clone)]
pub struct Collaborators {
	pub host: Arc<dyn BrowsingHost>,
	pub surface: Arc<dyn Surface>,
	pub config: Arc<dyn ConfigLookup>,
	pub relay: Arc<dyn RelayClient>,
	pub store: Arc<dyn SessionStore>,
}

/// Parameters of a single connect call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectRequest {
	/// Overrides the configured network from now on.
	pub network: Option<Network>,
}

impl ConnectRequest {
	pub fn on(network: Network) -> Self {
		Self { network: Some(network) }
	}
}

/// Connects to the Pera wallet and requests signatures from it.
///
/// One engine owns one [`Teller`]; the host forwards every inbound
/// cross-context message to [`deliver`](Self::deliver).
pub struct PeraWalletConnect {
	pub(crate) options: ConnectOptions,
	pub(crate) network: Mutex<Network>,
	pub(crate) machine: Mutex<SessionMachine>,
	pub(crate) teller: Arc<Teller>,
	pub(crate) host: Arc<dyn BrowsingHost>,
	pub(crate) surface: Arc<dyn Surface>,
	pub(crate) config: Arc<dyn ConfigLookup>,
	pub(crate) relay: Arc<dyn RelayClient>,
}

impl PeraWalletConnect {
	/// Creates the engine, loads the persisted session and adopts the relay
	/// client's latest session if none was persisted.
	pub fn new(options: ConnectOptions, collaborators: Collaborators) -> Result<Self> {
		options.validate()?;
		let machine = SessionMachine::load(collaborators.store)?;

		let engine = Self {
			network: Mutex::new(options.network),
			options,
			machine: Mutex::new(machine),
			teller: Arc::new(Teller::new()),
			host: collaborators.host,
			surface: collaborators.surface,
			config: collaborators.config,
			relay: collaborators.relay,
		};
		engine.restore_persisted_session()?;
		Ok(engine)
	}

	pub fn options(&self) -> &ConnectOptions {
		&self.options
	}

	pub fn teller(&self) -> &Arc<Teller> {
		&self.teller
	}

	/// Hands an inbound cross-context message to the live exchange.
	pub fn deliver(&self, message: InboundMessage) {
		self.teller.deliver(message);
	}

	pub fn network(&self) -> Network {
		*self.network.lock()
	}

	pub fn phase(&self) -> SessionPhase {
		self.machine.lock().phase()
	}

	pub fn session(&self) -> Option<Session> {
		self.machine.lock().session().cloned()
	}

	pub fn is_connected(&self) -> bool {
		self.machine.lock().is_connected()
	}

	pub fn accounts(&self) -> Vec<String> {
		self.machine.lock().accounts()
	}

	/// `"mobile"` or `"web"` for the active session.
	pub fn platform(&self) -> Option<&'static str> {
		self.machine.lock().session().map(Session::platform)
	}

	/// Adopts the relay client's most recent session when the engine holds
	/// none. Returns the adopted accounts.
	pub fn restore_persisted_session(&self) -> Result<Option<Vec<String>>> {
		if self.machine.lock().session().is_some() {
			return Ok(None);
		}

		let Some(latest) = self.relay.sessions().pop() else {
			debug!("No relay session to restore");
			return Ok(None);
		};

		let session = Session::relay(&latest, self.network()).with_chain_id(self.options.chain_id);
		let accounts = session.accounts.clone();
		self.machine.lock().adopt(session)?;
		Ok(Some(accounts))
	}

	/// Ends the session.
	///
	/// The mobile wallet is notified on a best-effort basis; local state is
	/// cleared regardless. Calling it without a session is a no-op.
	pub async fn disconnect(&self) -> Result<()> {
		let session = self.session();

		if let Some(session) = session.filter(|s| s.variant == WalletVariant::RelayMobile && !s.accounts.is_empty()) {
			if let Some(topic) = session.topic.as_deref() {
				if let Err(err) = self.relay.disconnect(topic, USER_DISCONNECTED).await {
					warn!(target: "pera.relay", error = %err, topic, "Relay disconnect failed");
				}
			}
		}

		self.machine.lock().clear()
	}

	/// Confirms the persisted session is still usable and returns its accounts.
	///
	/// Resolves with no accounts when there is nothing to reconnect to; a
	/// relay session the relay client no longer holds is dropped, leaving the
	/// engine idle.
	pub async fn reconnect_session(&self) -> Result<Vec<String>> {
		let Some(session) = self.session() else {
			return Ok(Vec::new());
		};

		match session.variant {
			WalletVariant::EmbeddedWeb => match self.config.lookup(session.network).await {
				Ok(config) if config.is_web_wallet_available => Ok(session.accounts),
				Ok(_) => Err(Error::session_reconnect(anyhow!("Pera Web is not available"))),
				Err(err) => {
					if let Err(cleanup) = self.disconnect().await {
						warn!(error = %cleanup, "Cleanup after failed reconnect failed");
					}
					Err(Error::session_reconnect(err))
				}
			},
			WalletVariant::RelayMobile => {
				let live = session.topic.as_deref().is_some_and(|topic| {
					self.relay.sessions().iter().any(|relay| relay.topic == topic)
				});
				if live {
					info!(accounts = session.accounts.len(), "Relay session reconnected");
					Ok(session.accounts)
				} else {
					debug!("No live relay session; nothing to reconnect");
					self.machine.lock().clear().map_err(Error::session_reconnect)?;
					Ok(Vec::new())
				}
			}
		}
	}
}
