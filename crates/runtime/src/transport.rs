//! Cross-context transports and their selection.
//!
//! A web wallet runs either inside an embedded sub-frame or in a separately
//! opened window/tab. Which one is used is a pure function of the host's
//! capability ([`select_transport`]) and never changes mid-exchange.
//!
//! The host environment provides the actual contexts through [`BrowsingHost`]
//! and [`TargetContext`]; this module only wraps them with addressing and the
//! send gate a popped window needs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::Result;

/// A browsing context envelopes can be posted to.
pub trait TargetContext: Send + Sync {
	/// Posts a serialized envelope, restricted to `target_origin`.
	fn post_message(&self, message: &str, target_origin: &str) -> Result<()>;

	/// Whether the user (or the wallet) closed this context.
	fn is_closed(&self) -> bool;

	/// Whether the context holds a valid opener reference back to the application.
	///
	/// Only meaningful for popped windows; frames always report `true`.
	fn has_opener(&self) -> bool {
		true
	}

	/// Closes the window or removes the frame. Must tolerate repeated calls.
	fn close(&self);
}

/// Host capability deciding how the web wallet is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCapability {
	/// Third-party frames can talk to the wallet (storage access permitted).
	FrameCapable,
	NotFrameCapable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
	/// Embedded sub-frame attached to a rendering surface.
	Frame,
	/// Separately opened top-level window or tab.
	PoppedWindow,
}

/// Chooses the transport for a host capability.
pub fn select_transport(capability: HostCapability) -> TransportKind {
	match capability {
		HostCapability::FrameCapable => TransportKind::Frame,
		HostCapability::NotFrameCapable => TransportKind::PoppedWindow,
	}
}

/// Identifier of the rendering surface a frame is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountPoint(pub String);

impl MountPoint {
	pub fn new(id: impl Into<String>) -> Self {
		MountPoint(id.into())
	}
}

/// Environment services needed to reach the web wallet.
#[async_trait]
pub trait BrowsingHost: Send + Sync {
	fn capability(&self) -> HostCapability;

	/// Whether the application runs on a mobile device.
	fn is_mobile(&self) -> bool;

	/// Creates a sub-frame at `url` inside `mount`.
	///
	/// Resolves once the frame's content context is ready to receive messages.
	async fn create_frame(&self, url: &Url, mount: &MountPoint) -> Result<Arc<dyn TargetContext>>;

	/// Opens a new top-level context at `url` and resolves once it exists.
	async fn open_window(&self, url: &Url) -> Result<Arc<dyn TargetContext>>;
}

/// Serialized origin used for addressing and inbound filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
	pub fn of(url: &Url) -> Self {
		Origin(url.origin().ascii_serialization())
	}

	pub fn parse(url: &str) -> Result<Self> {
		Ok(Self::of(&Url::parse(url)?))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Compares against an origin reported by the host for an inbound message.
	pub fn matches(&self, reported: &str) -> bool {
		self.0 == reported.trim_end_matches('/')
	}
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Marks a wallet URL as loaded inside the application's frame.
pub fn embedded_url(url: &Url) -> Url {
	let mut embedded = url.clone();
	embedded.query_pairs_mut().append_pair("embedded", "true");
	embedded
}

/// An opened wallet context with its addressing.
#[derive(Clone)]
pub struct ChannelTransport {
	kind: TransportKind,
	target: Arc<dyn TargetContext>,
	url: Url,
	origin: Origin,
}

impl fmt::Debug for ChannelTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChannelTransport")
			.field("kind", &self.kind)
			.field("url", &self.url.as_str())
			.field("origin", &self.origin)
			.finish()
	}
}

impl ChannelTransport {
	pub fn new(kind: TransportKind, target: Arc<dyn TargetContext>, url: Url) -> Self {
		let origin = Origin::of(&url);
		Self {
			kind,
			target,
			url,
			origin,
		}
	}

	/// Opens the wallet at `url` with the transport the host supports.
	///
	/// `mount` is only used for frames.
	pub async fn open(host: &dyn BrowsingHost, url: &Url, mount: &MountPoint) -> Result<Self> {
		match select_transport(host.capability()) {
			TransportKind::Frame => Self::open_frame(host, url, mount).await,
			TransportKind::PoppedWindow => Self::open_window(host, url).await,
		}
	}

	/// Creates an embedded frame for `url` inside `mount`.
	pub async fn open_frame(host: &dyn BrowsingHost, url: &Url, mount: &MountPoint) -> Result<Self> {
		let url = embedded_url(url);
		debug!(url = %url, mount = %mount.0, "Creating wallet frame");
		let target = host.create_frame(&url, mount).await?;
		Ok(Self::new(TransportKind::Frame, target, url))
	}

	/// Opens a separate window for `url`.
	pub async fn open_window(host: &dyn BrowsingHost, url: &Url) -> Result<Self> {
		debug!(url = %url, "Opening wallet window");
		let target = host.open_window(url).await?;
		Ok(Self::new(TransportKind::PoppedWindow, target, url.clone()))
	}

	pub fn kind(&self) -> TransportKind {
		self.kind
	}

	pub fn target(&self) -> &Arc<dyn TargetContext> {
		&self.target
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn origin(&self) -> &Origin {
		&self.origin
	}

	/// A popped window can only be written to once it reports its opener.
	pub fn can_send(&self) -> bool {
		match self.kind {
			TransportKind::Frame => true,
			TransportKind::PoppedWindow => self.target.has_opener(),
		}
	}

	/// Only popped windows can be closed by the user behind our back.
	pub fn needs_watchdog(&self) -> bool {
		self.kind == TransportKind::PoppedWindow
	}

	pub fn is_closed(&self) -> bool {
		self.target.is_closed()
	}

	pub fn teardown(&self) {
		debug!(kind = ?self.kind, origin = %self.origin, "Tearing down wallet context");
		self.target.close();
	}
}

/// Tears its transport down when dropped.
pub struct TransportGuard(ChannelTransport);

impl TransportGuard {
	pub fn new(transport: ChannelTransport) -> Self {
		TransportGuard(transport)
	}

	pub fn transport(&self) -> &ChannelTransport {
		&self.0
	}
}

impl Drop for TransportGuard {
	fn drop(&mut self) {
		self.0.teardown();
	}
}

#[cfg(test)]
mod tests;
