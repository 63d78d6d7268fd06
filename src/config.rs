//! Configuration management for oracle_feeds
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values.

use crate::client::Address;
use crate::constants::{registry, DEFAULT_CACHE_TTL_SECS, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{SdkError, SdkResult};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Flare,
    Songbird,
    Coston,
    Coston2,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Flare,
        Network::Songbird,
        Network::Coston,
        Network::Coston2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flare => "flare",
            Self::Songbird => "songbird",
            Self::Coston => "coston",
            Self::Coston2 => "coston2",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Flare => 14,
            Self::Songbird => 19,
            Self::Coston => 16,
            Self::Coston2 => 114,
        }
    }

    /// Public RPC endpoint
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Flare => "https://flare-api.flare.network/ext/C/rpc",
            Self::Songbird => "https://songbird-api.flare.network/ext/C/rpc",
            Self::Coston => "https://coston-api.flare.network/ext/C/rpc",
            Self::Coston2 => "https://coston2-api.flare.network/ext/C/rpc",
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Coston | Self::Coston2)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Network::ALL
            .into_iter()
            .find(|n| n.name() == wanted)
            .ok_or_else(|| SdkError::configuration(format!("unsupported network {:?}", s)))
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct SdkConfig {
    /// Network name: flare, songbird, coston, coston2
    #[serde(default = "default_network")]
    pub network: String,
    /// RPC endpoint; the network's public endpoint when unset
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Contract registry override
    #[serde(default)]
    pub registry_address: Option<String>,
    /// Value cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Subscription configuration
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
}

fn default_network() -> String {
    Network::Flare.name().to_string()
}

/// Value cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Disabled caches miss on every read
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Default TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Subscription configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Polling interval used when a subscriber does not pass one
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::for_network(Network::Flare)
    }
}

impl SdkConfig {
    /// Defaults for a given network
    pub fn for_network(network: Network) -> Self {
        Self {
            network: network.name().to_string(),
            rpc_url: None,
            registry_address: None,
            cache: CacheConfig::default(),
            subscriptions: SubscriptionConfig::default(),
        }
    }

    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (ORACLE_FEEDS_*)
    /// 2. config/oracle_feeds.yaml (if exists)
    /// 3. oracle_feeds.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(File::with_name("oracle_feeds").required(false))
            .add_source(File::with_name("config/oracle_feeds").required(false))
            // ORACLE_FEEDS_CACHE__TTL_SECONDS=30 -> cache.ttl_seconds = 30
            .add_source(
                Environment::with_prefix("ORACLE_FEEDS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load from a single file, without environment overrides
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Parsed network
    pub fn network(&self) -> SdkResult<Network> {
        self.network.parse()
    }

    /// RPC endpoint, falling back to the network's public one
    pub fn rpc_url(&self) -> SdkResult<String> {
        match &self.rpc_url {
            Some(url) => Ok(url.clone()),
            None => Ok(self.network()?.default_rpc_url().to_string()),
        }
    }

    /// Registry contract, honoring the override
    pub fn registry_address(&self) -> SdkResult<Address> {
        let raw = self
            .registry_address
            .as_deref()
            .unwrap_or(registry::ADDRESS);
        Ok(raw.parse::<Address>()?)
    }

    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.subscriptions.default_interval_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> SdkResult<()> {
        self.network()?;

        if self.rpc_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(SdkError::configuration("RPC URL must not be empty"));
        }

        let registry = self.registry_address()?;
        if registry.is_zero() {
            return Err(SdkError::configuration(
                "registry address must not be the zero address",
            ));
        }

        if self.subscriptions.default_interval_ms == 0 {
            return Err(SdkError::configuration(
                "default subscription interval must be greater than zero",
            ));
        }

        Ok(())
    }
}
