//! Error types for the cross-context runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exchanging envelopes with a wallet context.
#[derive(Debug, Error)]
pub enum Error {
	/// No matching response arrived before the exchange deadline.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The peer context was closed while the exchange was pending.
	#[error("Cancelled: {0}")]
	Cancelled(String),

	/// Posting to or opening a target context failed.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Wallet URL could not be parsed.
	#[error("Invalid URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}

	/// Returns true if the peer context went away.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::Cancelled(_))
	}
}
