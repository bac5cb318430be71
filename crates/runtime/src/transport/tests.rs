use super::*;
use crate::testing::{MockHost, MockTarget};

fn wallet_url() -> Url {
	Url::parse("https://web.perawallet.app/connect").unwrap()
}

#[test]
fn selection_follows_host_capability() {
	assert_eq!(select_transport(HostCapability::FrameCapable), TransportKind::Frame);
	assert_eq!(
		select_transport(HostCapability::NotFrameCapable),
		TransportKind::PoppedWindow
	);
}

#[test]
fn embedded_url_keeps_existing_query() {
	let url = Url::parse("https://web.perawallet.app/transaction/sign?lang=en").unwrap();
	assert_eq!(
		embedded_url(&url).as_str(),
		"https://web.perawallet.app/transaction/sign?lang=en&embedded=true"
	);
}

#[test]
fn origin_strips_path_and_query() {
	let origin = Origin::of(&embedded_url(&wallet_url()));
	assert_eq!(origin.as_str(), "https://web.perawallet.app");
	assert!(origin.matches("https://web.perawallet.app"));
	assert!(origin.matches("https://web.perawallet.app/"));
	assert!(!origin.matches("https://evil.example"));
	assert!(!origin.matches("http://web.perawallet.app"));
}

#[test]
fn origin_parse_rejects_garbage() {
	assert!(Origin::parse("not a url").is_err());
}

#[test]
fn popped_window_without_opener_cannot_send() {
	let transport = ChannelTransport::new(TransportKind::PoppedWindow, MockTarget::without_opener(), wallet_url());
	assert!(!transport.can_send());
	assert!(transport.needs_watchdog());

	let frame = ChannelTransport::new(TransportKind::Frame, MockTarget::without_opener(), wallet_url());
	assert!(frame.can_send());
	assert!(!frame.needs_watchdog());
}

#[tokio::test]
async fn open_frame_uses_embedded_url_and_mount() {
	let host = MockHost::frame_capable();
	let mount = MountPoint::new("sign-modal-body");

	let transport = ChannelTransport::open_frame(host.as_ref(), &wallet_url(), &mount)
		.await
		.unwrap();

	assert_eq!(transport.kind(), TransportKind::Frame);
	assert!(transport.url().query().unwrap().contains("embedded=true"));

	let opened = host.contexts();
	assert_eq!(opened.len(), 1);
	assert_eq!(opened[0].mount.as_ref(), Some(&mount));
	assert_eq!(opened[0].url, *transport.url());
}

#[tokio::test]
async fn teardown_closes_target_and_is_repeatable() {
	let host = MockHost::window_only();
	let transport = ChannelTransport::open_window(host.as_ref(), &wallet_url()).await.unwrap();
	let target = host.wait_for_context(1).await.target;

	transport.teardown();
	transport.teardown();

	assert!(transport.is_closed());
	assert_eq!(target.close_calls(), 2);
}

#[tokio::test]
async fn open_follows_host_capability() {
	let mount = MountPoint::new("connect-modal-body");

	let frame_host = MockHost::frame_capable();
	let frame = ChannelTransport::open(frame_host.as_ref(), &wallet_url(), &mount).await.unwrap();
	assert_eq!(frame.kind(), TransportKind::Frame);

	let window_host = MockHost::window_only();
	let window = ChannelTransport::open(window_host.as_ref(), &wallet_url(), &mount).await.unwrap();
	assert_eq!(window.kind(), TransportKind::PoppedWindow);
	assert_eq!(window.url(), &wallet_url());
	assert!(window_host.contexts()[0].mount.is_none());
}

#[test]
fn guard_tears_down_on_drop() {
	let target = MockTarget::new();
	let transport = ChannelTransport::new(TransportKind::Frame, target.clone(), wallet_url());

	let guard = TransportGuard::new(transport);
	assert!(!guard.transport().is_closed());
	drop(guard);

	assert_eq!(target.close_calls(), 1);
}
