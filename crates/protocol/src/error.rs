//! Error types for wire encoding and decoding.

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding or decoding wire payloads.
#[derive(Debug, Error)]
pub enum Error {
	/// A payload that should be base64 was not.
	#[error("Invalid base64 payload: {0}")]
	Base64(#[from] base64::DecodeError),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// A network name that is neither `mainnet` nor `testnet`.
	#[error("Unknown network: {0}")]
	UnknownNetwork(String),
}
