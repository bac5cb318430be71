mod common;

use std::sync::Arc;

use common::{FlakyStore, HarnessBuilder, MockRelay, relay_session};
use pera::relay::USER_DISCONNECTED;
use pera::{
	ConnectRequest, ErrorKind, HostCapability, JsonFileSessionStore, Network, Session, SessionPhase, SessionStore,
	SurfaceKind, WalletVariant,
};
use serde_json::json;

fn stored_relay_session() -> Session {
	Session::new(WalletVariant::RelayMobile, ["ADDR1".to_string()], Network::Testnet).with_topic("topic-1")
}

fn stored_web_session() -> Session {
	Session::new(WalletVariant::EmbeddedWeb, ["ADDR1".to_string(), "ADDR2".to_string()], Network::Testnet)
}

#[tokio::test]
async fn relay_reconnect_without_live_session_is_empty() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_relay_session())
		.build();

	let accounts = harness.engine.reconnect_session().await.unwrap();
	assert!(accounts.is_empty());
	assert_eq!(harness.engine.phase(), SessionPhase::Idle);
	assert!(!harness.engine.is_connected());
	assert!(harness.engine.accounts().is_empty());
	assert!(harness.stored().is_none(), "dead relay session dropped");
}

#[tokio::test]
async fn signing_after_dead_relay_reconnect_sends_nothing() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_relay_session())
		.build();
	harness.relay.set_response(Ok(json!(["c2lnbmVk"])));

	harness.engine.reconnect_session().await.unwrap();
	let txn = pera::SignerTransaction::new(vec![1]);
	let err = harness.engine.sign_transaction(&[vec![txn]], None).await.unwrap_err();

	assert_eq!(err.kind(), ErrorKind::SignTransactions);
	assert!(harness.relay.requests().is_empty(), "no request on a stale topic");
}

#[tokio::test]
async fn dead_relay_reconnect_store_failure_is_session_reconnect() {
	let store = FlakyStore::with_session(stored_relay_session());
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.store(store.clone())
		.build();
	store.fail_clear();

	let err = harness.engine.reconnect_session().await.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SessionReconnect);
	assert!(!harness.engine.is_connected());
}

#[tokio::test]
async fn relay_reconnect_with_live_session_returns_accounts() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_relay_session())
		.relay(MockRelay::with_sessions(vec![relay_session("topic-1", &["ADDR1"])]))
		.build();

	assert_eq!(harness.engine.reconnect_session().await.unwrap(), vec!["ADDR1"]);
	assert_eq!(harness.engine.platform(), Some("mobile"));
}

#[tokio::test]
async fn reconnect_without_session_is_empty() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable).build();
	assert!(harness.engine.reconnect_session().await.unwrap().is_empty());
	assert!(harness.config.lookups().is_empty());
}

#[tokio::test]
async fn web_reconnect_returns_stored_accounts() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_web_session())
		.build();

	assert_eq!(harness.engine.reconnect_session().await.unwrap(), vec!["ADDR1", "ADDR2"]);
	assert_eq!(harness.config.lookups(), vec![Network::Testnet]);
}

#[tokio::test]
async fn web_reconnect_fails_when_web_wallet_unavailable() {
	let config = pera::RemoteConfig {
		is_web_wallet_available: false,
		..common::web_config()
	};
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.config(config)
		.session(stored_web_session())
		.build();

	let err = harness.engine.reconnect_session().await.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SessionReconnect);
	assert_eq!(err.to_string(), "Pera Web is not available");
	assert!(harness.stored().is_some(), "session kept for a later retry");
}

#[tokio::test]
async fn web_reconnect_config_failure_disconnects() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_web_session())
		.build();
	harness.config.set(None);

	let err = harness.engine.reconnect_session().await.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SessionReconnect);
	assert!(harness.stored().is_none());
	assert_eq!(harness.engine.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn engine_adopts_latest_relay_session() {
	let relay = MockRelay::with_sessions(vec![
		relay_session("topic-old", &["OLD"]),
		relay_session("topic-new", &["NEW1", "NEW2"]),
	]);
	let harness = HarnessBuilder::new(HostCapability::FrameCapable).relay(relay).build();

	assert_eq!(harness.engine.phase(), SessionPhase::Connected);
	assert_eq!(harness.engine.accounts(), vec!["NEW1", "NEW2"]);

	let stored = harness.stored().unwrap();
	assert_eq!(stored.topic.as_deref(), Some("topic-new"));
	assert_eq!(stored.variant, WalletVariant::RelayMobile);

	assert_eq!(harness.engine.restore_persisted_session().unwrap(), None);
}

#[tokio::test]
async fn persisted_session_wins_over_relay_sessions() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_web_session())
		.relay(MockRelay::with_sessions(vec![relay_session("topic-1", &["OTHER"])]))
		.build();

	assert_eq!(harness.engine.accounts(), vec!["ADDR1", "ADDR2"]);
	assert_eq!(harness.engine.platform(), Some("web"));
}

#[tokio::test]
async fn disconnect_notifies_relay_and_is_idempotent() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_relay_session())
		.build();

	harness.engine.disconnect().await.unwrap();
	harness.engine.disconnect().await.unwrap();

	assert_eq!(
		harness.relay.disconnects(),
		vec![("topic-1".to_string(), USER_DISCONNECTED.to_string())]
	);
	assert!(harness.stored().is_none());
	assert_eq!(harness.engine.phase(), SessionPhase::Idle);
	assert!(!harness.engine.is_connected());
}

#[tokio::test]
async fn disconnect_clears_even_when_relay_fails() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_relay_session())
		.build();
	harness.relay.fail_disconnect();

	harness.engine.disconnect().await.unwrap();
	assert!(harness.stored().is_none());
	assert!(harness.engine.accounts().is_empty());
}

#[tokio::test]
async fn web_disconnect_does_not_touch_relay() {
	let harness = HarnessBuilder::new(HostCapability::FrameCapable)
		.session(stored_web_session())
		.build();

	harness.engine.disconnect().await.unwrap();
	assert!(harness.relay.disconnects().is_empty());
	assert!(harness.stored().is_none());
}

#[tokio::test]
async fn file_store_survives_engine_reload() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("pera-session.json");

	let store: Arc<dyn SessionStore> = Arc::new(JsonFileSessionStore::new(&path));
	let harness = HarnessBuilder::new(HostCapability::FrameCapable).store(store).build();
	let engine = harness.engine.clone();
	let task = tokio::spawn(async move { engine.connect(ConnectRequest::default()).await });

	harness.surface.wait_opened(SurfaceKind::ConnectModal, 1).await;
	harness.surface.select_web_wallet();
	let frame = harness.host.wait_for_context(1).await;
	frame.target.wait_for_posted(1).await;
	harness.reply(json!({"type": "CONNECT_CALLBACK", "data": {"addresses": ["ADDR7"]}}));
	task.await.unwrap().unwrap();

	let persisted: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
	assert_eq!(persisted["type"], "pera-wallet-web");
	assert_eq!(persisted["accounts"], json!(["ADDR7"]));

	let reloaded = HarnessBuilder::new(HostCapability::FrameCapable)
		.store(Arc::new(JsonFileSessionStore::new(&path)))
		.build();
	assert_eq!(reloaded.engine.accounts(), vec!["ADDR7"]);
	assert_eq!(reloaded.engine.phase(), SessionPhase::Connected);
	assert_eq!(reloaded.engine.reconnect_session().await.unwrap(), vec!["ADDR7"]);

	reloaded.engine.disconnect().await.unwrap();
	assert!(!path.exists());
}
