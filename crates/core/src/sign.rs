//! Signing requests.
//!
//! The transaction groups are flattened into wire items by
//! [`build_sign_request`], then sent either through the relay (mobile wallet)
//! or as a SIGN_TXN envelope (web wallet). Both paths reduce the answer to the
//! signed transaction bytes, in request order.

use anyhow::anyhow;
use pera_protocol::{
	Envelope, EnvelopeSet, SignatureEntry, SignerTransaction, WalletTransaction, WalletVariant, decode_base64,
	decode_signature_entries, to_wallet_transactions,
};
use pera_runtime::{ChannelTransport, MountPoint, TransportGuard, TransportKind, select_transport};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::WebWalletUrls;
use crate::engine::PeraWalletConnect;
use crate::error::{CancelCause, Error, Result};
use crate::relay::SIGN_METHOD;
use crate::session::Session;
use crate::surface::{SurfaceGuard, SurfaceHandle, SurfaceKind, SurfaceParams};

/// Mount used when the sign modal does not report one.
const SIGN_MODAL_MOUNT: &str = "pera-wallet-sign-txn-modal";

/// Flattens transaction groups into wire items.
///
/// When `signer` is given, items whose allow-list does not contain it get an
/// empty signer list so the wallet skips them.
pub fn build_sign_request(groups: &[Vec<SignerTransaction>], signer: Option<&str>) -> Vec<WalletTransaction> {
	to_wallet_transactions(groups, signer)
}

impl PeraWalletConnect {
	/// Asks the connected wallet to sign `groups` and returns the signed
	/// transactions it produced.
	pub async fn sign_transaction(
		&self,
		groups: &[Vec<SignerTransaction>],
		signer: Option<&str>,
	) -> Result<Vec<Vec<u8>>> {
		let Some(session) = self.session() else {
			return Err(Error::sign_transactions(anyhow!("no wallet is connected")));
		};

		let items = build_sign_request(groups, signer);
		debug!(items = items.len(), platform = session.platform(), "Signing transactions");

		match session.variant {
			WalletVariant::RelayMobile => self.sign_with_relay(&session, items).await,
			WalletVariant::EmbeddedWeb => self.sign_with_web_wallet(&session, items).await,
		}
	}

	async fn sign_with_relay(&self, session: &Session, items: Vec<WalletTransaction>) -> Result<Vec<Vec<u8>>> {
		let params = SurfaceParams {
			deep_link: self.options.deep_link.clone(),
			..Default::default()
		};
		let _surfaces = SurfaceGuard::new(
			self.surface.clone(),
			[SurfaceKind::RedirectModal, SurfaceKind::SignTxnToast],
		);

		let prompt = if self.host.is_mobile() {
			Some(SurfaceKind::RedirectModal)
		} else if self.options.should_show_sign_txn_toast {
			Some(SurfaceKind::SignTxnToast)
		} else {
			None
		};
		if let Some(kind) = prompt {
			if let Err(err) = self.surface.open(kind, &params).await {
				warn!(?kind, error = %err, "Failed to open signing prompt");
			}
		}

		let topic = session
			.topic
			.as_deref()
			.ok_or_else(|| Error::sign_transactions(anyhow!("relay session has no topic")))?;

		let response = self
			.relay
			.request(topic, SIGN_METHOD, json!(items), session.network.relay_chain())
			.await
			.map_err(Error::sign_transactions)?;

		let entries: Vec<Option<SignatureEntry>> = serde_json::from_value(response).map_err(Error::sign_transactions)?;
		let signed = decode_signature_entries(entries).map_err(Error::sign_transactions)?;
		debug!(signed = signed.len(), "Relay signing completed");
		Ok(signed)
	}

	async fn sign_with_web_wallet(&self, session: &Session, items: Vec<WalletTransaction>) -> Result<Vec<Vec<u8>>> {
		let config = self
			.config
			.lookup(session.network)
			.await
			.map_err(Error::sign_transactions)?;
		let urls =
			WebWalletUrls::resolve(&config.web_wallet_url, session.network).map_err(Error::sign_transactions)?;
		let _surfaces = SurfaceGuard::new(self.surface.clone(), [SurfaceKind::SignTxnModal]);

		let mut modal = None;
		let transport = match select_transport(self.host.capability()) {
			TransportKind::Frame => {
				let params = SurfaceParams {
					is_web_wallet_available: config.is_web_wallet_available,
					..Default::default()
				};
				let handle = self
					.surface
					.open(SurfaceKind::SignTxnModal, &params)
					.await
					.map_err(Error::sign_transactions)?;
				let mount = handle
					.mount
					.clone()
					.unwrap_or_else(|| MountPoint::new(SIGN_MODAL_MOUNT));
				modal = Some(handle);
				ChannelTransport::open_frame(self.host.as_ref(), &urls.transaction_sign, &mount).await
			}
			TransportKind::PoppedWindow => {
				ChannelTransport::open_window(self.host.as_ref(), &urls.transaction_sign).await
			}
		}
		.map_err(Error::sign_transactions)?;
		let _transport = TransportGuard::new(transport.clone());

		let request = Envelope::SignTxn { txn: items };
		let pending = self
			.teller
			.exchange(&request, &transport, EnvelopeSet::SIGN_REPLIES, self.options.sign_txn_timeout())
			.map_err(Error::sign_transactions)?;
		let mut pending = self.watch(pending, &transport);

		let reply = tokio::select! {
			reply = pending.settle() => reply,
			_ = modal_closed(&mut modal) => {
				return Err(Error::sign_txn_cancelled(CancelCause::ModalClosed, None));
			}
		};

		match reply {
			Ok(Envelope::SignTxnCallback { signed_txns }) => {
				let signed = signed_txns
					.iter()
					.map(|txn| decode_base64(&txn.signed_txn))
					.collect::<pera_protocol::Result<Vec<_>>>()
					.map_err(Error::sign_transactions)?;
				debug!(signed = signed.len(), "Web wallet signing completed");
				Ok(signed)
			}
			Ok(Envelope::SignTxnNetworkMismatch { error }) => Err(Error::sign_txn_network_mismatch(error)),
			Ok(Envelope::SignTxnCallbackError { error }) => {
				Err(Error::sign_txn_cancelled(CancelCause::WalletRejected, error))
			}
			Ok(Envelope::SessionDisconnected { error }) => {
				debug!("Web wallet reported the session as disconnected");
				if let Err(err) = self.machine.lock().mark_disconnected() {
					warn!(error = %err, "Failed to clear the persisted session");
				}
				Err(Error::session_disconnected(error))
			}
			Ok(other) => Err(Error::sign_transactions(anyhow!(
				"unexpected {} while signing",
				other.kind().as_str()
			))),
			Err(err) if err.is_cancelled() => Err(Error::sign_txn_cancelled(CancelCause::WindowClosed, None)),
			Err(err) => Err(Error::sign_transactions(err)),
		}
	}
}

async fn modal_closed(modal: &mut Option<SurfaceHandle>) {
	match modal {
		Some(modal) => modal.closed().await,
		None => std::future::pending().await,
	}
}
