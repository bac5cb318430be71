//! Liveness watchdog for popped-out wallet windows.
//!
//! A window opened for the wallet can be closed by the user at any time, and
//! no message is sent when that happens. The watchdog polls
//! [`TargetContext::is_closed`] on a fixed interval and fires once when the
//! window is gone.
//!
//! The watchdog is owned by the pending exchange it guards: dropping it aborts
//! the polling task, so it never outlives its exchange.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::transport::TargetContext;

/// Poll interval used unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

enum Signal {
	Waiting(oneshot::Receiver<()>),
	Fired,
	Stopped,
}

/// Polls a target until it reports closed.
pub struct Watchdog {
	signal: Signal,
	task: JoinHandle<()>,
}

impl Watchdog {
	/// Starts polling `target` every `interval`. The first check happens one
	/// interval after start.
	///
	/// Must be called from within a tokio runtime.
	pub fn spawn(target: Arc<dyn TargetContext>, interval: Duration) -> Self {
		let (tx, rx) = oneshot::channel();

		let task = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			ticker.tick().await;

			loop {
				ticker.tick().await;
				if target.is_closed() {
					debug!("Watchdog: wallet window closed");
					let _ = tx.send(());
					break;
				}
			}
		});

		Self {
			signal: Signal::Waiting(rx),
			task,
		}
	}

	/// Resolves once the target was seen closed. Never resolves if polling
	/// stopped without observing a close.
	///
	/// Cancellation safe; resolves immediately on every call after firing.
	pub async fn closed(&mut self) {
		if let Signal::Waiting(rx) = &mut self.signal {
			self.signal = match rx.await {
				Ok(()) => Signal::Fired,
				Err(_) => Signal::Stopped,
			};
		}

		if matches!(self.signal, Signal::Stopped) {
			std::future::pending::<()>().await;
		}
	}

	pub fn has_fired(&self) -> bool {
		matches!(self.signal, Signal::Fired)
	}

	/// Whether the polling task is still alive.
	pub fn is_running(&self) -> bool {
		!self.task.is_finished()
	}
}

impl Drop for Watchdog {
	fn drop(&mut self) {
		self.task.abort();
	}
}
