//! Connect flows.
//!
//! A connect call opens the connect modal and races three outcomes:
//! 1. The mobile wallet approves the relay pairing
//! 2. The user picks the web wallet, which then runs the envelope exchange
//! 3. The user closes the modal
//!
//! The web exchange is a small state machine over the wallet's replies:
//!
//! ```text
//! CONNECT ─► CONNECT_CALLBACK            → connected
//!         ─► CONNECT_NETWORK_MISMATCH    → failed
//!         ─► SELECT_ACCOUNT_EMBEDDED     → switch modal view, acknowledge, keep waiting
//!         ─► CREATE_PASSCODE_EMBEDDED    → continue in a popped window, keep waiting
//! ```

use anyhow::anyhow;
use pera_protocol::{Envelope, EnvelopeSet, EnvelopeType, Network, WalletVariant};
use pera_runtime::{ChannelTransport, MountPoint, PendingExchange, TransportGuard, TransportKind, Watchdog};
use tracing::{debug, info};

use crate::config::{RemoteConfig, WebWalletUrls};
use crate::engine::{ConnectRequest, PeraWalletConnect};
use crate::error::{Error, Result};
use crate::relay::algorand_namespaces;
use crate::session::Session;
use crate::surface::{ConnectView, SurfaceEvent, SurfaceGuard, SurfaceHandle, SurfaceKind, SurfaceParams};

/// Replies accepted from a wallet running in a popped window.
const POPPED_CONNECT_REPLIES: EnvelopeSet =
	EnvelopeSet::of(&[EnvelopeType::ConnectCallback, EnvelopeType::ConnectNetworkMismatch]);

impl PeraWalletConnect {
	/// Connects a wallet and returns its accounts.
	///
	/// An existing session is disconnected first, so at most one session
	/// exists at any time.
	pub async fn connect(&self, request: ConnectRequest) -> Result<Vec<String>> {
		if self.session().is_some() {
			debug!("Disconnecting previous session before connect");
			self.disconnect().await.map_err(Error::session_connect)?;
		}

		let network = match request.network {
			Some(network) => {
				*self.network.lock() = network;
				network
			}
			None => self.network(),
		};

		self.machine.lock().begin_connect();
		let connected = match self.run_connect(network).await {
			Ok(session) => self
				.machine
				.lock()
				.complete_connect(session)
				.map_err(Error::session_connect),
			Err(err) => Err(err),
		};

		if let Err(err) = &connected {
			debug!(kind = %err.kind(), error = %err, "Connect failed");
			self.machine.lock().fail_connect();
		}
		connected
	}

	async fn run_connect(&self, network: Network) -> Result<Session> {
		let config = self.config.lookup(network).await.map_err(Error::session_connect)?;
		let params = SurfaceParams {
			is_web_wallet_available: config.is_web_wallet_available,
			should_display_new_badge: config.should_display_new_badge,
			should_use_sound: config.should_use_sound,
			deep_link: self.options.deep_link.clone(),
		};

		let mut modal = self
			.surface
			.open(SurfaceKind::ConnectModal, &params)
			.await
			.map_err(Error::session_connect)?;
		let _modal_guard = SurfaceGuard::new(self.surface.clone(), [SurfaceKind::ConnectModal]);

		let pairing = self
			.relay
			.connect(&algorand_namespaces(network))
			.await
			.map_err(Error::session_connect)?;
		if let Some(uri) = pairing.uri.as_deref() {
			self.surface.render_qr(uri, &params);
		}
		let mut approval = pairing.approval;

		loop {
			tokio::select! {
				approved = &mut approval => {
					let relay_session = approved.map_err(Error::session_connect)?;
					debug!(topic = %relay_session.topic, "Relay pairing approved");
					return Ok(Session::relay(&relay_session, network).with_chain_id(self.options.chain_id));
				}
				event = modal.next_event() => match event {
					SurfaceEvent::WebWalletSelected { mount } if config.is_web_wallet_available => {
						return self.connect_with_web_wallet(network, &config, &mount, &mut modal).await;
					}
					SurfaceEvent::WebWalletSelected { .. } => {
						debug!("Ignoring web wallet selection: web wallet unavailable");
					}
					SurfaceEvent::Closed => return Err(Error::connect_modal_closed()),
				},
			}
		}
	}

	async fn connect_with_web_wallet(
		&self,
		network: Network,
		config: &RemoteConfig,
		mount: &MountPoint,
		modal: &mut SurfaceHandle,
	) -> Result<Session> {
		let urls = WebWalletUrls::resolve(&config.web_wallet_url, network).map_err(Error::session_connect)?;
		let connect = Envelope::connect(self.options.app_meta.clone(), self.options.chain_id);

		let transport = ChannelTransport::open(self.host.as_ref(), &urls.connect, mount)
			.await
			.map_err(Error::session_connect)?;
		let mut guards = vec![TransportGuard::new(transport.clone())];
		info!(kind = ?transport.kind(), url = %transport.url(), "Connecting with web wallet");

		// Passcode and account selection steps only happen inside the frame.
		let expected = match transport.kind() {
			TransportKind::Frame => EnvelopeSet::CONNECT_REPLIES,
			TransportKind::PoppedWindow => POPPED_CONNECT_REPLIES,
		};
		let mut pending = self
			.teller
			.exchange(&connect, &transport, expected, self.options.connect_timeout())
			.map_err(Error::session_connect)?;
		pending = self.watch(pending, &transport);

		loop {
			let reply = tokio::select! {
				reply = pending.settle() => reply.map_err(connect_exchange_error)?,
				_ = modal.closed() => return Err(Error::connect_modal_closed()),
			};

			match reply {
				Envelope::ConnectCallback { data } => {
					return Ok(Session::new(WalletVariant::EmbeddedWeb, data.addresses, network)
						.with_chain_id(self.options.chain_id));
				}
				Envelope::ConnectNetworkMismatch { error } => {
					return Err(Error::connect_network_mismatch(error));
				}
				Envelope::SelectAccountEmbedded => {
					self.surface.set_connect_view(ConnectView::SelectAccount);
					self.teller
						.send_message(&Envelope::SelectAccountEmbeddedCallback, &transport)
						.map_err(Error::session_connect)?;
				}
				Envelope::CreatePasscodeEmbedded => {
					debug!("Wallet needs a passcode; continuing in a new window");
					let window = ChannelTransport::open_window(self.host.as_ref(), &urls.connect)
						.await
						.map_err(Error::session_connect)?;
					guards.push(TransportGuard::new(window.clone()));

					let next = self
						.teller
						.exchange(&connect, &window, POPPED_CONNECT_REPLIES, None)
						.map_err(Error::session_connect)?;
					pending = self.watch(next, &window);
				}
				other => {
					return Err(Error::session_connect(anyhow!(
						"unexpected {} during connect",
						other.kind().as_str()
					)));
				}
			}
		}
	}

	/// Attaches a liveness watchdog when the transport can be closed by the user.
	pub(crate) fn watch(&self, pending: PendingExchange, transport: &ChannelTransport) -> PendingExchange {
		if transport.needs_watchdog() {
			pending.with_watchdog(Watchdog::spawn(
				transport.target().clone(),
				self.options.watchdog_interval(),
			))
		} else {
			pending
		}
	}
}

fn connect_exchange_error(err: pera_runtime::Error) -> Error {
	if err.is_cancelled() {
		Error::connect_cancelled()
	} else {
		Error::session_connect(err)
	}
}
