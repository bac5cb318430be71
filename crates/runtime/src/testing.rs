//! Testing infrastructure for code built on the runtime.
//!
//! Provides in-memory [`TargetContext`] and [`BrowsingHost`] implementations so
//! exchanges can be driven without a browser:
//!
//! - [`MockTarget`]: records posted envelopes, can be closed "by the user"
//! - [`MockHost`]: hands out [`MockTarget`]s and remembers what it opened
//!
//! Tests play the wallet by waiting for a context and its first envelope, then
//! calling [`crate::Teller::deliver`] with the reply.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use pera_protocol::Envelope;
use tokio::sync::Notify;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{BrowsingHost, HostCapability, MountPoint, TargetContext, TransportKind};

/// In-memory browsing context.
pub struct MockTarget {
	posted: Mutex<Vec<(String, String)>>,
	posted_notify: Notify,
	closed: AtomicBool,
	opener: AtomicBool,
	close_calls: AtomicUsize,
}

impl MockTarget {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::with_opener(true))
	}

	/// A popped window whose opener reference is missing.
	pub fn without_opener() -> Arc<Self> {
		Arc::new(Self::with_opener(false))
	}

	fn with_opener(opener: bool) -> Self {
		Self {
			posted: Mutex::new(Vec::new()),
			posted_notify: Notify::new(),
			closed: AtomicBool::new(false),
			opener: AtomicBool::new(opener),
			close_calls: AtomicUsize::new(0),
		}
	}

	/// Envelopes posted so far, in order.
	pub fn posted_envelopes(&self) -> Vec<Envelope> {
		self.posted
			.lock()
			.iter()
			.filter_map(|(message, _)| serde_json::from_str(message).ok())
			.collect()
	}

	/// Target origins used for each post.
	pub fn posted_origins(&self) -> Vec<String> {
		self.posted.lock().iter().map(|(_, origin)| origin.clone()).collect()
	}

	/// Waits until at least `count` envelopes were posted.
	pub async fn wait_for_posted(&self, count: usize) -> Vec<Envelope> {
		loop {
			let notified = self.posted_notify.notified();
			if self.posted.lock().len() >= count {
				return self.posted_envelopes();
			}
			notified.await;
		}
	}

	/// Closes the context the way a user closing the tab would.
	pub fn simulate_user_close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}

	/// Number of times the engine asked this context to close.
	pub fn close_calls(&self) -> usize {
		self.close_calls.load(Ordering::SeqCst)
	}
}

impl TargetContext for MockTarget {
	fn post_message(&self, message: &str, target_origin: &str) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(Error::TransportError("target context is closed".to_string()));
		}
		self.posted.lock().push((message.to_string(), target_origin.to_string()));
		self.posted_notify.notify_waiters();
		Ok(())
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn has_opener(&self) -> bool {
		self.opener.load(Ordering::SeqCst)
	}

	fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
		self.close_calls.fetch_add(1, Ordering::SeqCst);
	}
}

/// A context opened through [`MockHost`].
#[derive(Clone)]
pub struct OpenedContext {
	pub kind: TransportKind,
	pub url: Url,
	pub mount: Option<MountPoint>,
	pub target: Arc<MockTarget>,
}

/// In-memory browsing host.
pub struct MockHost {
	capability: HostCapability,
	mobile: AtomicBool,
	window_opener: AtomicBool,
	contexts: Mutex<Vec<OpenedContext>>,
	opened: Notify,
}

impl MockHost {
	pub fn new(capability: HostCapability) -> Arc<Self> {
		Arc::new(Self {
			capability,
			mobile: AtomicBool::new(false),
			window_opener: AtomicBool::new(true),
			contexts: Mutex::new(Vec::new()),
			opened: Notify::new(),
		})
	}

	pub fn frame_capable() -> Arc<Self> {
		Self::new(HostCapability::FrameCapable)
	}

	pub fn window_only() -> Arc<Self> {
		Self::new(HostCapability::NotFrameCapable)
	}

	pub fn set_mobile(&self, mobile: bool) {
		self.mobile.store(mobile, Ordering::SeqCst);
	}

	/// Controls whether windows opened from now on report an opener.
	pub fn set_window_opener(&self, opener: bool) {
		self.window_opener.store(opener, Ordering::SeqCst);
	}

	pub fn contexts(&self) -> Vec<OpenedContext> {
		self.contexts.lock().clone()
	}

	/// Waits until at least `count` contexts were opened and returns the `count`-th.
	pub async fn wait_for_context(&self, count: usize) -> OpenedContext {
		loop {
			let notified = self.opened.notified();
			if let Some(context) = self.contexts.lock().get(count - 1) {
				return context.clone();
			}
			notified.await;
		}
	}

	fn record(&self, kind: TransportKind, url: &Url, mount: Option<MountPoint>, target: Arc<MockTarget>) {
		self.contexts.lock().push(OpenedContext {
			kind,
			url: url.clone(),
			mount,
			target,
		});
		self.opened.notify_waiters();
	}
}

#[async_trait]
impl BrowsingHost for MockHost {
	fn capability(&self) -> HostCapability {
		self.capability
	}

	fn is_mobile(&self) -> bool {
		self.mobile.load(Ordering::SeqCst)
	}

	async fn create_frame(&self, url: &Url, mount: &MountPoint) -> Result<Arc<dyn TargetContext>> {
		let target = MockTarget::new();
		self.record(TransportKind::Frame, url, Some(mount.clone()), Arc::clone(&target));
		Ok(target)
	}

	async fn open_window(&self, url: &Url) -> Result<Arc<dyn TargetContext>> {
		let target = if self.window_opener.load(Ordering::SeqCst) {
			MockTarget::new()
		} else {
			MockTarget::without_opener()
		};
		self.record(TransportKind::PoppedWindow, url, None, Arc::clone(&target));
		Ok(target)
	}
}
