//! Session vocabulary shared by the engine and the persisted record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Algorand network the application is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	#[default]
	Mainnet,
	Testnet,
}

impl Network {
	pub fn as_str(&self) -> &'static str {
		match self {
			Network::Mainnet => "mainnet",
			Network::Testnet => "testnet",
		}
	}

	/// CAIP-2 chain reference announced in the relay namespace.
	pub fn relay_chain(&self) -> &'static str {
		match self {
			Network::Mainnet => "algorand:wGHE2Pwdvd7S12BL5FaOP20EGYesN73k",
			Network::Testnet => "algorand:SGO1GKSzyE7IEPItTxCByw9x8FmnrCDe",
		}
	}

	/// Chain identifier the wallet expects for this network.
	pub fn chain_id(&self) -> ChainId {
		match self {
			Network::Mainnet => ChainId::MAINNET,
			Network::Testnet => ChainId::TESTNET,
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Network {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"mainnet" => Ok(Network::Mainnet),
			"testnet" => Ok(Network::Testnet),
			other => Err(Error::UnknownNetwork(other.to_string())),
		}
	}
}

/// Numeric chain identifier forwarded with CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u32);

impl ChainId {
	pub const MAINNET: ChainId = ChainId(416001);
	pub const TESTNET: ChainId = ChainId(416002);
	pub const BETANET: ChainId = ChainId(416003);
	/// Accepts any network the wallet is on.
	pub const ALL_NETWORKS: ChainId = ChainId(4160);
}

/// Which wallet flavour holds the session.
///
/// Serialized names match the values stored by earlier releases so that
/// persisted sessions survive upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletVariant {
	/// Mobile wallet reached through the relay client.
	#[serde(rename = "pera-wallet")]
	RelayMobile,
	/// Web wallet running in a sub-frame or a popped-out window.
	#[serde(rename = "pera-wallet-web")]
	EmbeddedWeb,
}

impl WalletVariant {
	/// Platform label exposed to applications (`"mobile"` or `"web"`).
	pub fn platform(&self) -> &'static str {
		match self {
			WalletVariant::RelayMobile => "mobile",
			WalletVariant::EmbeddedWeb => "web",
		}
	}
}

/// Application metadata shown by the wallet during connect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMeta {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub icon: String,
	#[serde(default)]
	pub url: String,
}
