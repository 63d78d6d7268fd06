//! Network session
//!
//! Owns the active [`PriceFeed`] and swaps it out on a network switch. The
//! outgoing feed is shut down first, so its subscriptions stop and its
//! cache and resolved addresses are discarded with it.

use crate::client::RemoteClient;
use crate::config::{Network, SdkConfig};
use crate::error::{SdkError, SdkResult};
use crate::price::{FeedSettings, PriceFeed};
use parking_lot::RwLock;
use std::sync::Arc;

pub struct NetworkSession {
    current: RwLock<Option<PriceFeed>>,
    /// Template for cache and subscription settings of new feeds
    config: SdkConfig,
}

impl NetworkSession {
    /// Start a session on `network` using `client`
    pub fn new(config: SdkConfig, client: Arc<dyn RemoteClient>) -> SdkResult<Self> {
        let feed = PriceFeed::new(client, FeedSettings::from_config(&config)?);
        Ok(Self {
            current: RwLock::new(Some(feed)),
            config,
        })
    }

    /// Handle to the active feed
    pub fn feed(&self) -> SdkResult<PriceFeed> {
        self.current
            .read()
            .clone()
            .ok_or_else(|| SdkError::not_initialized("network session has been shut down"))
    }

    pub fn network(&self) -> Option<Network> {
        self.current.read().as_ref().map(|feed| feed.network())
    }

    /// Replace the active feed with one bound to `network` and `client`
    ///
    /// Clones of the old feed held elsewhere become disposed.
    pub fn switch_network(&self, network: Network, client: Arc<dyn RemoteClient>) -> SdkResult<PriceFeed> {
        let mut config = self.config.clone();
        config.network = network.name().to_string();
        // A custom endpoint belongs to the previous network
        config.rpc_url = None;
        let feed = PriceFeed::new(client, FeedSettings::from_config(&config)?);

        let previous = self.current.write().replace(feed.clone());
        if let Some(previous) = previous {
            tracing::info!(from = %previous.network(), to = %network, "Switching network");
            previous.shutdown();
        }

        Ok(feed)
    }

    /// Shut the active feed down and end the session
    pub fn shutdown(&self) {
        if let Some(feed) = self.current.write().take() {
            feed.shutdown();
        }
    }
}

impl Drop for NetworkSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
