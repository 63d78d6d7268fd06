//! oracle_feeds
//!
//! Client-side access to FTSOv2 oracle prices on Flare networks.
//! Contract addresses are resolved once through the on-chain registry,
//! quotes are cached briefly, and polling subscriptions push fresh quotes
//! to callbacks. Transport is supplied by the caller via [`RemoteClient`].

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod price;
pub mod resolver;
pub mod session;
pub mod subscription;
pub mod telemetry;

// Re-export commonly used types
pub use cache::{CacheStats, TtlCache};
pub use client::{Address, CallValue, RemoteClient};
pub use config::{Network, SdkConfig};
pub use error::{ErrorKind, SdkError, SdkResult};
pub use metrics::FeedMetrics;
pub use price::{FeedCategory, FeedId, FeedSettings, GetOptions, PriceFeed, PriceQuote};
pub use resolver::AddressResolver;
pub use session::NetworkSession;
pub use subscription::{PollingSubscriptionManager, Subscription, SubscriptionId};
