//! Shared collaborators for the engine integration tests.
//!
//! Each test builds a [`Harness`] and plays the wallet side: it waits for the
//! engine to open a surface or a context, then emits surface events or
//! delivers wallet replies.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use pera::relay::Approval;
use pera::{
	Collaborators, ConfigLookup, ConnectOptions, ConnectView, HostCapability, InboundMessage, MemorySessionStore,
	MountPoint, Namespaces, Network, PeraWalletConnect, RelayClient, RelayPairing, RelaySession, RemoteConfig,
	Session, SessionStore, Surface, SurfaceEvent, SurfaceHandle, SurfaceKind, SurfaceParams,
};
use pera_runtime::testing::MockHost;
use serde_json::Value;
use tokio::sync::{Notify, mpsc, oneshot};

pub const WALLET_ORIGIN: &str = "https://web.perawallet.app";
pub const SIGN_MODAL_MOUNT: &str = "sign-modal-body";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn web_config() -> RemoteConfig {
	RemoteConfig {
		is_web_wallet_available: true,
		web_wallet_url: WALLET_ORIGIN.to_string(),
		should_display_new_badge: true,
		should_use_sound: false,
	}
}

pub fn fast_options() -> ConnectOptions {
	ConnectOptions::new("test-project")
		.with_network(Network::Testnet)
		.with_watchdog_interval(Duration::from_millis(20))
}

pub fn relay_session(topic: &str, addresses: &[&str]) -> RelaySession {
	RelaySession::new(
		topic,
		addresses
			.iter()
			.map(|address| format!("{}:{address}", Network::Testnet.relay_chain())),
	)
}

/// Remote configuration that can be swapped or made to fail.
pub struct MockConfig {
	config: Mutex<Option<RemoteConfig>>,
	lookups: Mutex<Vec<Network>>,
}

impl MockConfig {
	pub fn new(config: RemoteConfig) -> Arc<Self> {
		Arc::new(Self {
			config: Mutex::new(Some(config)),
			lookups: Mutex::new(Vec::new()),
		})
	}

	pub fn set(&self, config: Option<RemoteConfig>) {
		*self.config.lock() = config;
	}

	pub fn lookups(&self) -> Vec<Network> {
		self.lookups.lock().clone()
	}
}

#[async_trait]
impl ConfigLookup for MockConfig {
	async fn lookup(&self, network: Network) -> anyhow::Result<RemoteConfig> {
		self.lookups.lock().push(network);
		self.config
			.lock()
			.clone()
			.ok_or_else(|| anyhow!("configuration service unreachable"))
	}
}

/// Surface that records calls and lets tests emit user interactions.
pub struct MockSurface {
	opened: Mutex<Vec<SurfaceKind>>,
	closed: Mutex<Vec<SurfaceKind>>,
	qr_codes: Mutex<Vec<String>>,
	views: Mutex<Vec<ConnectView>>,
	senders: Mutex<HashMap<SurfaceKind, mpsc::UnboundedSender<SurfaceEvent>>>,
	opened_notify: Notify,
}

impl MockSurface {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			opened: Mutex::new(Vec::new()),
			closed: Mutex::new(Vec::new()),
			qr_codes: Mutex::new(Vec::new()),
			views: Mutex::new(Vec::new()),
			senders: Mutex::new(HashMap::new()),
			opened_notify: Notify::new(),
		})
	}

	pub fn opened(&self) -> Vec<SurfaceKind> {
		self.opened.lock().clone()
	}

	pub fn closed(&self) -> Vec<SurfaceKind> {
		self.closed.lock().clone()
	}

	pub fn qr_codes(&self) -> Vec<String> {
		self.qr_codes.lock().clone()
	}

	pub fn views(&self) -> Vec<ConnectView> {
		self.views.lock().clone()
	}

	/// Waits until `kind` was opened `count` times.
	pub async fn wait_opened(&self, kind: SurfaceKind, count: usize) {
		loop {
			let notified = self.opened_notify.notified();
			if self.opened.lock().iter().filter(|opened| **opened == kind).count() >= count {
				return;
			}
			notified.await;
		}
	}

	pub fn emit(&self, kind: SurfaceKind, event: SurfaceEvent) {
		let senders = self.senders.lock();
		let sender = senders.get(&kind).expect("surface is not open");
		sender.send(event).expect("surface handle dropped");
	}

	pub fn select_web_wallet(&self) {
		self.emit(
			SurfaceKind::ConnectModal,
			SurfaceEvent::WebWalletSelected {
				mount: MountPoint::new("connect-modal-body"),
			},
		);
	}
}

#[async_trait]
impl Surface for MockSurface {
	async fn open(&self, kind: SurfaceKind, _params: &SurfaceParams) -> anyhow::Result<SurfaceHandle> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.senders.lock().insert(kind, tx);
		self.opened.lock().push(kind);
		self.opened_notify.notify_waiters();

		let mount = (kind == SurfaceKind::SignTxnModal).then(|| MountPoint::new(SIGN_MODAL_MOUNT));
		Ok(SurfaceHandle::new(kind, mount, rx))
	}

	fn close(&self, kind: SurfaceKind) {
		self.senders.lock().remove(&kind);
		self.closed.lock().push(kind);
	}

	fn render_qr(&self, uri: &str, _params: &SurfaceParams) {
		self.qr_codes.lock().push(uri.to_string());
	}

	fn set_connect_view(&self, view: ConnectView) {
		self.views.lock().push(view);
	}
}

/// Memory store whose writes can be made to fail.
pub struct FlakyStore {
	inner: MemorySessionStore,
	fail_set: AtomicBool,
	fail_clear: AtomicBool,
}

impl FlakyStore {
	pub fn new() -> Arc<Self> {
		Self::wrap(MemorySessionStore::new())
	}

	pub fn with_session(session: Session) -> Arc<Self> {
		Self::wrap(MemorySessionStore::with_session(session))
	}

	fn wrap(inner: MemorySessionStore) -> Arc<Self> {
		Arc::new(Self {
			inner,
			fail_set: AtomicBool::new(false),
			fail_clear: AtomicBool::new(false),
		})
	}

	pub fn fail_set(&self) {
		self.fail_set.store(true, Ordering::SeqCst);
	}

	pub fn fail_clear(&self) {
		self.fail_clear.store(true, Ordering::SeqCst);
	}
}

impl SessionStore for FlakyStore {
	fn get(&self) -> pera::Result<Option<Session>> {
		self.inner.get()
	}

	fn set(&self, session: &Session) -> pera::Result<()> {
		if self.fail_set.load(Ordering::SeqCst) {
			return Err(pera::Error::Store(anyhow!("disk full")));
		}
		self.inner.set(session)
	}

	fn clear(&self) -> pera::Result<()> {
		if self.fail_clear.load(Ordering::SeqCst) {
			return Err(pera::Error::Store(anyhow!("disk full")));
		}
		self.inner.clear()
	}
}

/// A recorded relay request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
	pub topic: String,
	pub method: String,
	pub params: Value,
	pub chain: String,
}

/// Relay client driven by the test.
pub struct MockRelay {
	pending_approval: Mutex<Option<oneshot::Sender<anyhow::Result<RelaySession>>>>,
	namespaces: Mutex<Vec<Namespaces>>,
	connected: Notify,
	requests: Mutex<Vec<RelayRequest>>,
	response: Mutex<Option<anyhow::Result<Value>>>,
	disconnects: Mutex<Vec<(String, String)>>,
	fail_disconnect: AtomicBool,
	sessions: Mutex<Vec<RelaySession>>,
}

impl MockRelay {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			pending_approval: Mutex::new(None),
			namespaces: Mutex::new(Vec::new()),
			connected: Notify::new(),
			requests: Mutex::new(Vec::new()),
			response: Mutex::new(None),
			disconnects: Mutex::new(Vec::new()),
			fail_disconnect: AtomicBool::new(false),
			sessions: Mutex::new(Vec::new()),
		})
	}

	pub fn with_sessions(sessions: Vec<RelaySession>) -> Arc<Self> {
		let relay = Self::new();
		*relay.sessions.lock() = sessions;
		relay
	}

	/// Waits until the engine started pairing `count` times.
	pub async fn wait_for_pairing(&self, count: usize) {
		loop {
			let notified = self.connected.notified();
			if self.namespaces.lock().len() >= count {
				return;
			}
			notified.await;
		}
	}

	/// Approves the latest pairing; the session also becomes live.
	pub fn approve(&self, session: RelaySession) {
		self.sessions.lock().push(session.clone());
		let sender = self.pending_approval.lock().take().expect("no pairing in progress");
		let _ = sender.send(Ok(session));
	}

	pub fn reject_pairing(&self, reason: &str) {
		let sender = self.pending_approval.lock().take().expect("no pairing in progress");
		let _ = sender.send(Err(anyhow!(reason.to_string())));
	}

	pub fn set_response(&self, response: anyhow::Result<Value>) {
		*self.response.lock() = Some(response);
	}

	pub fn fail_disconnect(&self) {
		self.fail_disconnect.store(true, Ordering::SeqCst);
	}

	pub fn namespaces(&self) -> Vec<Namespaces> {
		self.namespaces.lock().clone()
	}

	pub fn requests(&self) -> Vec<RelayRequest> {
		self.requests.lock().clone()
	}

	pub fn disconnects(&self) -> Vec<(String, String)> {
		self.disconnects.lock().clone()
	}
}

#[async_trait]
impl RelayClient for MockRelay {
	async fn connect(&self, namespaces: &Namespaces) -> anyhow::Result<RelayPairing> {
		let (tx, rx) = oneshot::channel();
		*self.pending_approval.lock() = Some(tx);
		self.namespaces.lock().push(namespaces.clone());
		self.connected.notify_waiters();

		let approval: Approval =
			Box::pin(async move { rx.await.unwrap_or_else(|_| Err(anyhow!("pairing abandoned"))) });
		Ok(RelayPairing {
			uri: Some("wc:pairing@2?relay-protocol=irn".to_string()),
			approval,
		})
	}

	async fn request(&self, topic: &str, method: &str, params: Value, chain: &str) -> anyhow::Result<Value> {
		self.requests.lock().push(RelayRequest {
			topic: topic.to_string(),
			method: method.to_string(),
			params,
			chain: chain.to_string(),
		});
		self.response
			.lock()
			.take()
			.unwrap_or_else(|| Err(anyhow!("no response configured")))
	}

	async fn disconnect(&self, topic: &str, reason: &str) -> anyhow::Result<()> {
		self.disconnects.lock().push((topic.to_string(), reason.to_string()));
		self.sessions.lock().retain(|session| session.topic != topic);
		if self.fail_disconnect.load(Ordering::SeqCst) {
			return Err(anyhow!("relay socket closed"));
		}
		Ok(())
	}

	fn sessions(&self) -> Vec<RelaySession> {
		self.sessions.lock().clone()
	}
}

/// Engine wired to in-memory collaborators.
pub struct Harness {
	pub engine: Arc<PeraWalletConnect>,
	pub host: Arc<MockHost>,
	pub surface: Arc<MockSurface>,
	pub config: Arc<MockConfig>,
	pub relay: Arc<MockRelay>,
	pub store: Arc<dyn SessionStore>,
}

pub struct HarnessBuilder {
	capability: HostCapability,
	options: ConnectOptions,
	config: RemoteConfig,
	store: Arc<dyn SessionStore>,
	relay: Arc<MockRelay>,
	mobile: bool,
}

impl HarnessBuilder {
	pub fn new(capability: HostCapability) -> Self {
		Self {
			capability,
			options: fast_options(),
			config: web_config(),
			store: Arc::new(MemorySessionStore::new()),
			relay: MockRelay::new(),
			mobile: false,
		}
	}

	pub fn options(mut self, options: ConnectOptions) -> Self {
		self.options = options;
		self
	}

	pub fn config(mut self, config: RemoteConfig) -> Self {
		self.config = config;
		self
	}

	pub fn session(self, session: Session) -> Self {
		self.store(Arc::new(MemorySessionStore::with_session(session)))
	}

	pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
		self.store = store;
		self
	}

	pub fn relay(mut self, relay: Arc<MockRelay>) -> Self {
		self.relay = relay;
		self
	}

	pub fn mobile(mut self) -> Self {
		self.mobile = true;
		self
	}

	pub fn build(self) -> Harness {
		init_tracing();

		let host = MockHost::new(self.capability);
		host.set_mobile(self.mobile);
		let surface = MockSurface::new();
		let config = MockConfig::new(self.config);

		let engine = PeraWalletConnect::new(
			self.options,
			Collaborators {
				host: host.clone(),
				surface: surface.clone(),
				config: config.clone(),
				relay: self.relay.clone(),
				store: self.store.clone(),
			},
		)
		.expect("engine should build");

		Harness {
			engine: Arc::new(engine),
			host,
			surface,
			config,
			relay: self.relay,
			store: self.store,
		}
	}
}

impl Harness {
	pub fn frame() -> Self {
		HarnessBuilder::new(HostCapability::FrameCapable).build()
	}

	pub fn window() -> Self {
		HarnessBuilder::new(HostCapability::NotFrameCapable).build()
	}

	/// Delivers a wallet reply from the wallet origin.
	pub fn reply(&self, data: Value) {
		self.engine.deliver(InboundMessage::new(WALLET_ORIGIN, data));
	}

	pub fn stored(&self) -> Option<Session> {
		self.store.get().expect("store read")
	}
}
