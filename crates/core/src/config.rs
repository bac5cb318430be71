//! Engine options and the remote configuration boundary.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use pera_protocol::{AppMeta, ChainId, Network};
use pera_runtime::DEFAULT_POLL_INTERVAL;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_MAINNET_WEB_WALLET: &str = "https://web.perawallet.app";
const DEFAULT_TESTNET_WEB_WALLET: &str = "https://testnet.web.perawallet.app";

/// Options the application constructs the engine with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectOptions {
	/// Relay project identifier.
	pub project_id: String,
	pub network: Network,
	/// Chain the wallet should connect to; `None` lets the wallet decide.
	pub chain_id: Option<ChainId>,
	pub app_meta: AppMeta,
	/// Deep link used by the redirect modal on mobile devices.
	pub deep_link: Option<String>,
	pub should_show_sign_txn_toast: bool,
	/// Deadline for the first CONNECT reply from the web wallet.
	pub connect_timeout_ms: Option<u64>,
	/// Deadline for the SIGN_TXN reply from the web wallet.
	pub sign_txn_timeout_ms: Option<u64>,
	pub watchdog_interval_ms: u64,
}

impl Default for ConnectOptions {
	fn default() -> Self {
		Self {
			project_id: String::new(),
			network: Network::default(),
			chain_id: None,
			app_meta: AppMeta::default(),
			deep_link: None,
			should_show_sign_txn_toast: true,
			connect_timeout_ms: None,
			sign_txn_timeout_ms: None,
			watchdog_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
		}
	}
}

impl ConnectOptions {
	pub fn new(project_id: impl Into<String>) -> Self {
		Self {
			project_id: project_id.into(),
			..Default::default()
		}
	}

	/// Parses options from their JSON form.
	pub fn from_json(json: &str) -> Result<Self> {
		let options: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
		options.validate()?;
		Ok(options)
	}

	pub fn validate(&self) -> Result<()> {
		if self.watchdog_interval_ms == 0 {
			return Err(Error::Config("watchdogIntervalMs must be greater than zero".into()));
		}
		Ok(())
	}

	pub fn with_network(mut self, network: Network) -> Self {
		self.network = network;
		self
	}

	pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
		self.chain_id = Some(chain_id);
		self
	}

	pub fn with_app_meta(mut self, app_meta: AppMeta) -> Self {
		self.app_meta = app_meta;
		self
	}

	pub fn with_deep_link(mut self, deep_link: impl Into<String>) -> Self {
		self.deep_link = Some(deep_link.into());
		self
	}

	pub fn with_sign_txn_toast(mut self, show: bool) -> Self {
		self.should_show_sign_txn_toast = show;
		self
	}

	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout_ms = Some(timeout.as_millis() as u64);
		self
	}

	pub fn with_sign_txn_timeout(mut self, timeout: Duration) -> Self {
		self.sign_txn_timeout_ms = Some(timeout.as_millis() as u64);
		self
	}

	pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
		self.watchdog_interval_ms = interval.as_millis() as u64;
		self
	}

	pub fn connect_timeout(&self) -> Option<Duration> {
		self.connect_timeout_ms.map(Duration::from_millis)
	}

	pub fn sign_txn_timeout(&self) -> Option<Duration> {
		self.sign_txn_timeout_ms.map(Duration::from_millis)
	}

	pub fn watchdog_interval(&self) -> Duration {
		Duration::from_millis(self.watchdog_interval_ms)
	}
}

/// Remote configuration for one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
	pub is_web_wallet_available: bool,
	/// Base URL of the web wallet; empty selects the network default.
	#[serde(rename = "webWalletURL")]
	pub web_wallet_url: String,
	pub should_display_new_badge: bool,
	pub should_use_sound: bool,
}

/// Source of [`RemoteConfig`], consulted before every connect and before
/// every web wallet signing request.
#[async_trait]
pub trait ConfigLookup: Send + Sync {
	async fn lookup(&self, network: Network) -> anyhow::Result<RemoteConfig>;
}

/// Fixed per-network configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLookup {
	configs: HashMap<Network, RemoteConfig>,
}

impl StaticConfigLookup {
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses `config` for every network.
	pub fn uniform(config: RemoteConfig) -> Self {
		Self::new()
			.with(Network::Mainnet, config.clone())
			.with(Network::Testnet, config)
	}

	pub fn with(mut self, network: Network, config: RemoteConfig) -> Self {
		self.configs.insert(network, config);
		self
	}
}

#[async_trait]
impl ConfigLookup for StaticConfigLookup {
	async fn lookup(&self, network: Network) -> anyhow::Result<RemoteConfig> {
		self.configs
			.get(&network)
			.cloned()
			.ok_or_else(|| anyhow!("no configuration for {network}"))
	}
}

/// Web wallet entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebWalletUrls {
	pub root: Url,
	pub connect: Url,
	pub transaction_sign: Url,
}

impl WebWalletUrls {
	/// Derives the entry points from a configured base URL, falling back to
	/// the network's default wallet when `base` is empty.
	pub fn resolve(base: &str, network: Network) -> std::result::Result<Self, url::ParseError> {
		let base = match base.trim() {
			"" => match network {
				Network::Mainnet => DEFAULT_MAINNET_WEB_WALLET,
				Network::Testnet => DEFAULT_TESTNET_WEB_WALLET,
			},
			configured => configured,
		};

		let mut root = Url::parse(base)?;
		if !root.path().ends_with('/') {
			let path = format!("{}/", root.path());
			root.set_path(&path);
		}

		Ok(Self {
			connect: root.join("connect")?,
			transaction_sign: root.join("transaction/sign")?,
			root,
		})
	}
}
