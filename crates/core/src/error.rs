//! Caller-facing failures.
//!
//! Every failure surfaced by [`PeraWalletConnect`](crate::PeraWalletConnect)
//! maps to one [`ErrorKind`]. The kind names match the strings applications
//! already switch on (`"CONNECT_CANCELLED"`, `"SIGN_TXN_NETWORK_MISMATCH"`, ...).

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) const CONNECT_CANCELLED_MESSAGE: &str = "Connect is cancelled by user";
pub(crate) const CONNECT_MODAL_CLOSED_MESSAGE: &str = "Connect modal is closed by user";
pub(crate) const CONNECT_NETWORK_MISMATCH_MESSAGE: &str = "Your wallet is connected to a different network to this dApp. \
	 Update your wallet to the correct network (MainNet or TestNet) to continue.";
pub(crate) const SIGN_TXN_CANCELLED_MESSAGE: &str = "Transaction signing is cancelled by user.";
pub(crate) const SIGN_TXN_NETWORK_MISMATCH_MESSAGE: &str = "Network mismatch";
pub(crate) const SESSION_DISCONNECTED_MESSAGE: &str = "Session is disconnected";

/// Why a signing request was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
	/// The popped-out wallet window was closed.
	WindowClosed,
	/// The sign modal was closed.
	ModalClosed,
	/// The wallet reported it could not or would not sign.
	WalletRejected,
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("{message}")]
	ConnectCancelled { message: String },

	#[error("{message}")]
	ConnectModalClosed { message: String },

	#[error("{message}")]
	ConnectNetworkMismatch {
		message: String,
		/// Error string reported by the wallet, if any.
		detail: Option<String>,
	},

	/// Catch-all connect failure.
	#[error("{message}")]
	SessionConnect {
		message: String,
		#[source]
		source: anyhow::Error,
	},

	#[error("{message}")]
	SessionReconnect {
		message: String,
		#[source]
		source: anyhow::Error,
	},

	/// The wallet no longer knows this session; local state was cleared.
	#[error("{message}")]
	SessionDisconnected { message: String, detail: Option<String> },

	#[error("{message}")]
	SignTxnCancelled { message: String, cause: CancelCause },

	#[error("{message}")]
	SignTxnNetworkMismatch { message: String, detail: Option<String> },

	/// Catch-all signing failure.
	#[error("{message}")]
	SignTransactions {
		message: String,
		#[source]
		source: anyhow::Error,
	},

	#[error("session store failed: {0}")]
	Store(#[source] anyhow::Error),

	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	pub(crate) fn connect_cancelled() -> Self {
		Error::ConnectCancelled {
			message: CONNECT_CANCELLED_MESSAGE.to_string(),
		}
	}

	pub(crate) fn connect_modal_closed() -> Self {
		Error::ConnectModalClosed {
			message: CONNECT_MODAL_CLOSED_MESSAGE.to_string(),
		}
	}

	pub(crate) fn connect_network_mismatch(detail: Option<String>) -> Self {
		Error::ConnectNetworkMismatch {
			message: detail
				.clone()
				.unwrap_or_else(|| CONNECT_NETWORK_MISMATCH_MESSAGE.to_string()),
			detail,
		}
	}

	pub(crate) fn session_connect(source: impl Into<anyhow::Error>) -> Self {
		let source = source.into();
		Error::SessionConnect {
			message: source.to_string(),
			source,
		}
	}

	pub(crate) fn session_reconnect(source: impl Into<anyhow::Error>) -> Self {
		let source = source.into();
		Error::SessionReconnect {
			message: source.to_string(),
			source,
		}
	}

	pub(crate) fn session_disconnected(detail: Option<String>) -> Self {
		Error::SessionDisconnected {
			message: detail
				.clone()
				.unwrap_or_else(|| SESSION_DISCONNECTED_MESSAGE.to_string()),
			detail,
		}
	}

	pub(crate) fn sign_txn_cancelled(cause: CancelCause, message: Option<String>) -> Self {
		Error::SignTxnCancelled {
			message: message.unwrap_or_else(|| SIGN_TXN_CANCELLED_MESSAGE.to_string()),
			cause,
		}
	}

	pub(crate) fn sign_txn_network_mismatch(detail: Option<String>) -> Self {
		Error::SignTxnNetworkMismatch {
			message: detail
				.clone()
				.unwrap_or_else(|| SIGN_TXN_NETWORK_MISMATCH_MESSAGE.to_string()),
			detail,
		}
	}

	pub(crate) fn sign_transactions(source: impl Into<anyhow::Error>) -> Self {
		let source = source.into();
		Error::SignTransactions {
			message: source.to_string(),
			source,
		}
	}

	pub(crate) fn store(source: impl Into<anyhow::Error>) -> Self {
		Error::Store(source.into())
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::ConnectCancelled { .. } => ErrorKind::ConnectCancelled,
			Error::ConnectModalClosed { .. } => ErrorKind::ConnectModalClosed,
			Error::ConnectNetworkMismatch { .. } => ErrorKind::ConnectNetworkMismatch,
			Error::SessionConnect { .. } => ErrorKind::SessionConnect,
			Error::SessionReconnect { .. } => ErrorKind::SessionReconnect,
			Error::SessionDisconnected { .. } => ErrorKind::SessionDisconnected,
			Error::SignTxnCancelled { .. } => ErrorKind::SignTxnCancelled,
			Error::SignTxnNetworkMismatch { .. } => ErrorKind::SignTxnNetworkMismatch,
			Error::SignTransactions { .. } => ErrorKind::SignTransactions,
			Error::Store(_) => ErrorKind::Store,
			Error::Config(_) => ErrorKind::Config,
		}
	}

	/// Error string the wallet attached to the failure envelope.
	pub fn detail(&self) -> Option<&str> {
		match self {
			Error::ConnectNetworkMismatch { detail, .. }
			| Error::SessionDisconnected { detail, .. }
			| Error::SignTxnNetworkMismatch { detail, .. } => detail.as_deref(),
			_ => None,
		}
	}
}

/// Stable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	ConnectCancelled,
	ConnectModalClosed,
	ConnectNetworkMismatch,
	SessionConnect,
	SessionReconnect,
	SessionDisconnected,
	SignTxnCancelled,
	SignTxnNetworkMismatch,
	SignTransactions,
	Store,
	Config,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::ConnectCancelled => "CONNECT_CANCELLED",
			ErrorKind::ConnectModalClosed => "CONNECT_MODAL_CLOSED",
			ErrorKind::ConnectNetworkMismatch => "CONNECT_NETWORK_MISMATCH",
			ErrorKind::SessionConnect => "SESSION_CONNECT",
			ErrorKind::SessionReconnect => "SESSION_RECONNECT",
			ErrorKind::SessionDisconnected => "SESSION_DISCONNECTED",
			ErrorKind::SignTxnCancelled => "SIGN_TXN_CANCELLED",
			ErrorKind::SignTxnNetworkMismatch => "SIGN_TXN_NETWORK_MISMATCH",
			ErrorKind::SignTransactions => "SIGN_TRANSACTIONS",
			ErrorKind::Store => "SESSION_STORE",
			ErrorKind::Config => "CONFIG",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
