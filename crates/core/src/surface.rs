//! Transient UI surfaces (modals, toast, QR code).
//!
//! Rendering belongs to the host. The engine opens a surface, listens to the
//! events it reports and closes it on every terminal path through a
//! [`SurfaceGuard`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use pera_runtime::MountPoint;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
	/// QR code plus the optional web wallet entry point.
	ConnectModal,
	/// Prompts a mobile user to switch to the wallet app.
	RedirectModal,
	/// Desktop hint to confirm the request on the phone.
	SignTxnToast,
	/// Hosts the web wallet frame while signing.
	SignTxnModal,
}

/// Rendering hints from the remote configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceParams {
	pub is_web_wallet_available: bool,
	pub should_display_new_badge: bool,
	pub should_use_sound: bool,
	pub deep_link: Option<String>,
}

/// View shown inside the connect modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectView {
	Default,
	/// The embedded wallet moved on to account selection.
	SelectAccount,
}

/// User interaction reported by a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
	/// User chose the web wallet; the frame goes into `mount`.
	WebWalletSelected { mount: MountPoint },
	/// User closed the surface.
	Closed,
}

/// An opened surface.
pub struct SurfaceHandle {
	pub kind: SurfaceKind,
	/// Where a wallet frame can be attached, for surfaces that host one.
	pub mount: Option<MountPoint>,
	events: Option<mpsc::UnboundedReceiver<SurfaceEvent>>,
}

impl SurfaceHandle {
	pub fn new(kind: SurfaceKind, mount: Option<MountPoint>, events: mpsc::UnboundedReceiver<SurfaceEvent>) -> Self {
		Self {
			kind,
			mount,
			events: Some(events),
		}
	}

	/// A surface that never reports events.
	pub fn passive(kind: SurfaceKind) -> Self {
		Self {
			kind,
			mount: None,
			events: None,
		}
	}

	/// Next user interaction. Pends forever once the surface stops reporting.
	pub async fn next_event(&mut self) -> SurfaceEvent {
		if let Some(events) = self.events.as_mut() {
			if let Some(event) = events.recv().await {
				return event;
			}
			debug!(kind = ?self.kind, "Surface event stream ended");
			self.events = None;
		}
		std::future::pending().await
	}

	/// Resolves when the user closes the surface.
	pub async fn closed(&mut self) {
		loop {
			if self.next_event().await == SurfaceEvent::Closed {
				return;
			}
		}
	}
}

#[async_trait]
pub trait Surface: Send + Sync {
	async fn open(&self, kind: SurfaceKind, params: &SurfaceParams) -> Result<SurfaceHandle>;

	/// Removes the surface. Must tolerate surfaces that are already closed.
	fn close(&self, kind: SurfaceKind);

	/// Shows the relay pairing URI inside the connect modal.
	fn render_qr(&self, uri: &str, params: &SurfaceParams);

	fn set_connect_view(&self, view: ConnectView);
}

/// Closes its surfaces when dropped.
pub struct SurfaceGuard {
	surface: Arc<dyn Surface>,
	kinds: Vec<SurfaceKind>,
}

impl SurfaceGuard {
	pub fn new(surface: Arc<dyn Surface>, kinds: impl IntoIterator<Item = SurfaceKind>) -> Self {
		Self {
			surface,
			kinds: kinds.into_iter().collect(),
		}
	}
}

impl Drop for SurfaceGuard {
	fn drop(&mut self) {
		for kind in &self.kinds {
			debug!(?kind, "Closing surface");
			self.surface.close(*kind);
		}
	}
}
