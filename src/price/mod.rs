//! Price feed facade
//!
//! Composes address resolution, the value cache and polling subscriptions
//! behind a small read/subscribe API:
//! - `get_price` / `get_feed`: cached read, remote on miss
//! - `get_prices`: concurrent fan-out, all-or-nothing, input order kept
//! - `subscribe`: uncached polling with per-subscriber cadence
//! - `clear_cache`, `shutdown`
//!
//! A `PriceFeed` is bound to one network. Switching networks means building
//! a new feed; nothing is shared between feeds.

mod feed_id;
mod quote;

pub use feed_id::{FeedCategory, FeedId};
pub use quote::PriceQuote;

use crate::cache::{CacheStats, TtlCache};
use crate::client::{Address, CallValue, RemoteClient};
use crate::config::{Network, SdkConfig};
use crate::constants::{ftso, registry};
use crate::error::{SdkError, SdkResult};
use crate::metrics::FeedMetrics;
use crate::resolver::AddressResolver;
use crate::subscription::{PollingSubscriptionManager, Subscription};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Per-read cache behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Consult the cache before going to the network
    pub use_cache: bool,
    /// TTL for this read; the feed default when `None`
    pub ttl_seconds: Option<u64>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            ttl_seconds: None,
        }
    }
}

impl GetOptions {
    /// Always read from the network
    pub fn fresh() -> Self {
        Self {
            use_cache: false,
            ttl_seconds: None,
        }
    }

    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            use_cache: true,
            ttl_seconds: Some(ttl_seconds),
        }
    }
}

/// Settings a feed is built from
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub network: Network,
    pub registry: Address,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub default_interval: Duration,
}

impl FeedSettings {
    pub fn for_network(network: Network) -> SdkResult<Self> {
        Self::from_config(&SdkConfig::for_network(network))
    }

    pub fn from_config(config: &SdkConfig) -> SdkResult<Self> {
        config.validate()?;
        Ok(Self {
            network: config.network()?,
            registry: config.registry_address()?,
            cache_enabled: config.cache.enabled,
            cache_ttl_secs: config.cache.ttl_seconds,
            default_interval: config.default_interval(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedState {
    Ready,
    Disposed,
}

struct FeedInner {
    network: Network,
    client: Arc<dyn RemoteClient>,
    resolver: AddressResolver,
    cache: TtlCache<PriceQuote>,
    subscriptions: PollingSubscriptionManager,
    metrics: Arc<FeedMetrics>,
    state: RwLock<FeedState>,
}

/// Oracle price access for one network
///
/// Cloning is cheap and clones share state. When the last clone is dropped
/// every subscription is cancelled.
#[derive(Clone)]
pub struct PriceFeed {
    inner: Arc<FeedInner>,
}

impl PriceFeed {
    /// Create a feed over an existing client
    pub fn new(client: Arc<dyn RemoteClient>, settings: FeedSettings) -> Self {
        let metrics = Arc::new(FeedMetrics::new(settings.network.name()));
        let resolver = AddressResolver::new(Arc::clone(&client), settings.registry)
            .with_metrics(Arc::clone(&metrics));
        let cache = if settings.cache_enabled {
            TtlCache::new(settings.cache_ttl_secs)
        } else {
            TtlCache::disabled()
        };
        let subscriptions =
            PollingSubscriptionManager::with_metrics(settings.default_interval, Arc::clone(&metrics));

        tracing::info!(
            network = %settings.network,
            registry = %settings.registry,
            cache_enabled = settings.cache_enabled,
            cache_ttl_secs = settings.cache_ttl_secs,
            "Price feed initialized"
        );

        Self {
            inner: Arc::new(FeedInner {
                network: settings.network,
                client,
                resolver,
                cache,
                subscriptions,
                metrics,
                state: RwLock::new(FeedState::Ready),
            }),
        }
    }

    /// Create a feed from configuration, building the client with `connect`
    ///
    /// `connect` receives the validated configuration. Its failure is
    /// reported as `NotInitialized`.
    pub fn from_config<F>(config: &SdkConfig, connect: F) -> SdkResult<Self>
    where
        F: FnOnce(&SdkConfig) -> anyhow::Result<Arc<dyn RemoteClient>>,
    {
        let settings = FeedSettings::from_config(config)?;
        let client = connect(config).map_err(|e| {
            SdkError::not_initialized(format!("failed to create client for {}", settings.network))
                .with_client_cause(e)
        })?;
        Ok(Self::new(client, settings))
    }

    pub fn network(&self) -> Network {
        self.inner.network
    }

    pub fn is_disposed(&self) -> bool {
        *self.inner.state.read() == FeedState::Disposed
    }

    /// Price for a crypto symbol such as `"BTC"` or `"ETH/USD"`
    pub async fn get_price(&self, symbol: &str, options: GetOptions) -> SdkResult<PriceQuote> {
        let feed = FeedId::crypto(symbol)?;
        self.inner.read(&feed, options).await
    }

    /// Price for an explicit feed id (any category)
    pub async fn get_feed(&self, feed: &FeedId, options: GetOptions) -> SdkResult<PriceQuote> {
        self.inner.read(feed, options).await
    }

    /// Prices for several symbols, fetched concurrently
    ///
    /// Fails if any symbol fails. Results follow the input order.
    pub async fn get_prices<I, S>(&self, symbols: I, options: GetOptions) -> SdkResult<Vec<PriceQuote>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let feeds = symbols
            .into_iter()
            .map(|s| FeedId::crypto(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let reads = feeds.iter().map(|feed| self.inner.read(feed, options));
        futures_util::future::join_all(reads)
            .await
            .into_iter()
            .collect()
    }

    /// Poll `symbol` and deliver every fresh quote to `callback`
    ///
    /// The first quote is delivered immediately, then one per `interval`
    /// (the feed default when `None`). Reads bypass the cache.
    pub fn subscribe<C>(
        &self,
        symbol: &str,
        callback: C,
        interval: Option<Duration>,
    ) -> SdkResult<Subscription>
    where
        C: Fn(PriceQuote) + Send + Sync + 'static,
    {
        self.inner.ensure_ready()?;
        let feed = FeedId::crypto(symbol)?;
        let weak: Weak<FeedInner> = Arc::downgrade(&self.inner);
        let topic = feed.name().to_string();

        let fetch = move || {
            let weak = weak.clone();
            let feed = feed.clone();
            async move {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| SdkError::not_initialized("price feed has been dropped"))?;
                inner.read(&feed, GetOptions::fresh()).await
            }
        };

        let subscription = self
            .inner
            .subscriptions
            .subscribe(&topic, fetch, callback, interval)?;

        // A concurrent shutdown may have drained the table before the insert
        if let Err(e) = self.inner.ensure_ready() {
            subscription.unsubscribe();
            return Err(e);
        }
        Ok(subscription)
    }

    /// Current block height on this feed's network
    pub async fn block_number(&self) -> SdkResult<u64> {
        self.inner.ensure_ready()?;
        self.inner
            .client
            .block_number()
            .await
            .map_err(|e| SdkError::value_unavailable("block number unavailable").with_client_cause(e))
    }

    /// Address of a registry entry, if it has been resolved already
    pub fn resolved_address(&self, logical_name: &str) -> Option<Address> {
        self.inner.resolver.cached(logical_name)
    }

    /// Drop all cached quotes. Subscriptions and resolved addresses stay.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.inner.subscriptions.active_count()
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.inner.metrics
    }

    /// Cancel all subscriptions, clear the cache and refuse further reads
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.write();
            if *state == FeedState::Disposed {
                return;
            }
            *state = FeedState::Disposed;
        }

        self.inner.subscriptions.shutdown_all();
        self.inner.cache.clear();
        tracing::info!(network = %self.inner.network, "Price feed shut down");
    }
}

impl fmt::Debug for PriceFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceFeed")
            .field("network", &self.inner.network)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl FeedInner {
    fn ensure_ready(&self) -> SdkResult<()> {
        match *self.state.read() {
            FeedState::Ready => Ok(()),
            FeedState::Disposed => Err(SdkError::not_initialized(format!(
                "price feed for {} has been shut down",
                self.network
            ))),
        }
    }

    async fn read(&self, feed: &FeedId, options: GetOptions) -> SdkResult<PriceQuote> {
        self.ensure_ready()?;

        let key = feed.to_hex();
        if options.use_cache {
            let ttl = options.ttl_seconds.map(Duration::from_secs);
            if let Some(quote) = self.cache.get(&key, ttl) {
                self.metrics.cache_hits.inc();
                return Ok(quote);
            }
        }
        self.metrics.cache_misses.inc();

        let ftso = self.resolver.resolve(registry::FTSO_V2).await.map_err(|e| {
            SdkError::value_unavailable(format!("price read for {} failed", feed)).with_cause(e)
        })?;

        tracing::debug!(feed = %feed, contract = %ftso, "Fetching price");
        self.metrics.record_remote_call(ftso::GET_FEED_BY_ID);

        let answer = self
            .client
            .call(
                ftso,
                ftso::GET_FEED_BY_ID,
                &[CallValue::Bytes(feed.to_bytes().to_vec())],
            )
            .await
            .map_err(|e| {
                SdkError::value_unavailable(format!("price read for {} failed", feed))
                    .with_client_cause(e)
            })?;

        let quote = PriceQuote::from_call_value(feed, &answer)?;
        {
            // Held across the insert so shutdown cannot clear in between
            let state = self.state.read();
            if *state == FeedState::Ready {
                self.cache.set(key, quote.clone());
            }
        }

        tracing::debug!(
            feed = %feed,
            value = %quote.value,
            timestamp = quote.timestamp.timestamp(),
            "Price fetched"
        );

        Ok(quote)
    }
}
