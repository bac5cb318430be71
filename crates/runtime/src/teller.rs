//! Teller: envelope dispatch and the single live inbound listener.
//!
//! This module implements the request/response correlation layer on top of a
//! [`ChannelTransport`]. It handles:
//! - Serializing and posting envelopes to the wallet context
//! - Keeping exactly one live inbound listener per engine
//! - Filtering inbound messages by origin and parsing them into envelopes
//! - Settling a [`PendingExchange`] on a matching reply, its deadline or
//!   watchdog cancellation
//!
//! # Message Flow
//!
//! 1. Caller calls [`Teller::exchange`] with an envelope, transport and expected reply types
//! 2. Teller registers a listener for the transport origin, replacing the previous one
//! 3. Envelope is serialized and posted to the target context
//! 4. Host calls [`Teller::deliver`] for every inbound cross-context message
//! 5. Matching envelopes are forwarded to the live listener
//! 6. Caller awaits [`PendingExchange::settle`] until a reply, timeout or cancellation
//!
//! Only one exchange is meaningful at a time per application instance.
//! Registering a new listener deactivates the previous one without rejecting
//! it: the replaced exchange still settles through its own deadline or
//! watchdog.

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pera_protocol::{Envelope, EnvelopeSet, InboundFrame};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{ChannelTransport, Origin};
use crate::watchdog::Watchdog;

/// Inbound message as reported by the host.
#[derive(Debug, Clone)]
pub struct InboundMessage {
	/// Origin of the sending context.
	pub origin: String,
	/// Message payload.
	pub data: Value,
}

impl InboundMessage {
	pub fn new(origin: impl Into<String>, data: Value) -> Self {
		Self {
			origin: origin.into(),
			data,
		}
	}
}

struct ActiveListener {
	id: u64,
	origin: Origin,
	tx: mpsc::UnboundedSender<Envelope>,
}

type ListenerSlot = Arc<Mutex<Option<ActiveListener>>>;

/// Envelope dispatcher owned by one engine instance.
pub struct Teller {
	last_id: AtomicU64,
	active: ListenerSlot,
}

impl Default for Teller {
	fn default() -> Self {
		Self::new()
	}
}

impl Teller {
	pub fn new() -> Self {
		Self {
			last_id: AtomicU64::new(0),
			active: Arc::new(Mutex::new(None)),
		}
	}

	/// Serializes `envelope` and posts it to the transport's target.
	///
	/// Returns `Ok(false)` when the send was skipped because a popped window
	/// has no opener yet; the caller then relies on the watchdog and later
	/// messages. Never retries.
	pub fn send_message(&self, envelope: &Envelope, transport: &ChannelTransport) -> Result<bool> {
		if !transport.can_send() {
			debug!(
				kind = envelope.kind().as_str(),
				origin = %transport.origin(),
				"Skipping send: wallet window has no opener"
			);
			return Ok(false);
		}

		let payload = serde_json::to_string(envelope)?;
		debug!(kind = envelope.kind().as_str(), origin = %transport.origin(), "Sending envelope");
		transport
			.target()
			.post_message(&payload, transport.origin().as_str())?;
		Ok(true)
	}

	/// Registers the single live inbound listener for `origin`.
	///
	/// Any previously registered listener is deactivated; its receiver sees
	/// the channel close but is not otherwise notified.
	pub fn setup_listener(&self, origin: Origin) -> Listener {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = mpsc::unbounded_channel();

		let previous = self.active.lock().replace(ActiveListener {
			id,
			origin: origin.clone(),
			tx,
		});
		if let Some(previous) = previous {
			debug!(previous = previous.id, id, "Replacing active listener");
		}
		debug!(id, origin = %origin, "Listener registered");

		Listener {
			id,
			rx,
			slot: Arc::clone(&self.active),
		}
	}

	/// Id of the live listener, if any.
	pub fn active_listener(&self) -> Option<u64> {
		self.active.lock().as_ref().map(|listener| listener.id)
	}

	/// Hands an inbound message to the live listener.
	///
	/// Messages from unexpected origins, without a listener, or that do not
	/// parse as a known envelope are dropped silently.
	pub fn deliver(&self, message: InboundMessage) {
		let active = self.active.lock();
		let Some(listener) = active.as_ref() else {
			debug!(origin = %message.origin, "Dropping message: no active listener");
			return;
		};

		if !listener.origin.matches(&message.origin) {
			debug!(
				origin = %message.origin,
				expected = %listener.origin,
				"Dropping message from unexpected origin"
			);
			return;
		}

		match serde_json::from_value::<InboundFrame>(message.data) {
			Ok(InboundFrame::Known(envelope)) => {
				debug!(id = listener.id, kind = envelope.kind().as_str(), "Envelope received");
				if listener.tx.send(envelope).is_err() {
					debug!(id = listener.id, "Listener receiver already dropped");
				}
			}
			Ok(InboundFrame::Unknown(value)) => {
				debug!(
					"Unknown envelope (forward-compatible, ignored): {}",
					serde_json::to_string(&value).unwrap_or_else(|_| "<serialization failed>".to_string())
				);
			}
			Err(e) => {
				debug!("Failed to parse inbound message: {}", e);
			}
		}
	}

	/// Starts an exchange: registers a listener for the transport origin, then
	/// sends `envelope`.
	///
	/// With `timeout` set, [`PendingExchange::settle`] fails with
	/// [`Error::Timeout`] once it elapses without a matching reply.
	pub fn exchange(
		&self,
		envelope: &Envelope,
		transport: &ChannelTransport,
		expected: EnvelopeSet,
		timeout: Option<Duration>,
	) -> Result<PendingExchange> {
		let listener = self.setup_listener(transport.origin().clone());
		self.send_message(envelope, transport)?;
		Ok(PendingExchange::new(listener, expected, timeout))
	}
}

/// Receiving half of a listener registration.
///
/// Dropping it unregisters the listener, unless it was already replaced.
pub struct Listener {
	id: u64,
	rx: mpsc::UnboundedReceiver<Envelope>,
	slot: ListenerSlot,
}

impl Listener {
	pub fn id(&self) -> u64 {
		self.id
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		let mut active = self.slot.lock();
		if active.as_ref().is_some_and(|listener| listener.id == self.id) {
			*active = None;
			debug!(id = self.id, "Listener removed");
		}
	}
}

/// An outstanding request awaiting its reply.
///
/// Owns the listener registration, the optional deadline and the optional
/// watchdog; all three are released together when the exchange is dropped.
pub struct PendingExchange {
	listener: Listener,
	expected: EnvelopeSet,
	deadline: Option<Instant>,
	watchdog: Option<Watchdog>,
}

impl PendingExchange {
	pub fn new(listener: Listener, expected: EnvelopeSet, timeout: Option<Duration>) -> Self {
		Self {
			listener,
			expected,
			deadline: timeout.map(|timeout| Instant::now() + timeout),
			watchdog: None,
		}
	}

	/// Attaches a liveness watchdog that cancels the exchange.
	pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
		self.watchdog = Some(watchdog);
		self
	}

	pub fn id(&self) -> u64 {
		self.listener.id
	}

	pub fn expected(&self) -> EnvelopeSet {
		self.expected
	}

	/// Changes the reply types accepted by later [`settle`](Self::settle) calls.
	pub fn expect(&mut self, expected: EnvelopeSet) {
		self.expected = expected;
	}

	/// Waits for the next envelope whose type is expected.
	///
	/// Envelopes of other types are ignored. If the listener is replaced the
	/// exchange keeps waiting on its deadline and watchdog only.
	pub async fn settle(&mut self) -> Result<Envelope> {
		let mut listening = true;

		loop {
			tokio::select! {
				biased;
				_ = cancelled(&mut self.watchdog) => {
					debug!(id = self.listener.id, "Exchange cancelled: wallet window closed");
					return Err(Error::Cancelled("wallet window was closed".to_string()));
				}
				_ = expired(self.deadline) => {
					debug!(id = self.listener.id, "Exchange timed out");
					return Err(Error::Timeout("no response from wallet".to_string()));
				}
				received = self.listener.rx.recv(), if listening => match received {
					Some(envelope) if self.expected.contains(envelope.kind()) => return Ok(envelope),
					Some(envelope) => {
						debug!(
							id = self.listener.id,
							kind = envelope.kind().as_str(),
							"Ignoring unexpected envelope"
						);
					}
					None => {
						debug!(id = self.listener.id, "Listener replaced; waiting on deadline or watchdog");
						listening = false;
					}
				},
			}
		}
	}
}

async fn cancelled(watchdog: &mut Option<Watchdog>) {
	match watchdog {
		Some(watchdog) => watchdog.closed().await,
		None => pending().await,
	}
}

async fn expired(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => pending().await,
	}
}
