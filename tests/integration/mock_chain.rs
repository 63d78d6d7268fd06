//! Scripted in-memory chain implementing `RemoteClient`

use oracle_feeds::constants::{ftso, registry};
use oracle_feeds::{Address, CallValue, FeedId, RemoteClient};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FTSO_ADDRESS: Address = Address::from_bytes([0x42; 20]);

/// Oracle timestamp of the first answer; each read adds one second
const BASE_TIMESTAMP: u64 = 1_700_000_000;

pub struct MockChain {
    /// (raw value, decimals) per feed name
    prices: Mutex<HashMap<String, (u128, i8)>>,
    /// Feeds whose reads currently fail
    failing_feeds: Mutex<HashSet<String>>,
    /// Per-feed read latency
    delays: Mutex<HashMap<String, Duration>>,
    /// Remaining registry lookups that fail
    registry_failures: AtomicUsize,
    /// Remaining price reads that fail, across all feeds
    read_failures: AtomicUsize,
    registry_lookups: AtomicUsize,
    price_reads: AtomicUsize,
    block: AtomicU64,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        let chain = Self {
            prices: Mutex::new(HashMap::new()),
            failing_feeds: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            registry_failures: AtomicUsize::new(0),
            read_failures: AtomicUsize::new(0),
            registry_lookups: AtomicUsize::new(0),
            price_reads: AtomicUsize::new(0),
            block: AtomicU64::new(1_000),
        };
        chain.set_price("BTC/USD", 6_712_345, 2);
        chain.set_price("ETH/USD", 312_050, 2);
        chain.set_price("FLR/USD", 2_150, 5);
        Arc::new(chain)
    }

    pub fn set_price(&self, feed: &str, raw: u128, decimals: i8) {
        self.prices.lock().insert(feed.to_string(), (raw, decimals));
    }

    pub fn set_delay(&self, feed: &str, delay: Duration) {
        self.delays.lock().insert(feed.to_string(), delay);
    }

    pub fn fail_feed(&self, feed: &str, failing: bool) {
        let mut failing_feeds = self.failing_feeds.lock();
        if failing {
            failing_feeds.insert(feed.to_string());
        } else {
            failing_feeds.remove(feed);
        }
    }

    pub fn fail_next_lookups(&self, count: usize) {
        self.registry_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_reads(&self, count: usize) {
        self.read_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    pub fn registry_lookups(&self) -> usize {
        self.registry_lookups.load(Ordering::SeqCst)
    }

    pub fn price_reads(&self) -> usize {
        self.price_reads.load(Ordering::SeqCst)
    }

    pub fn client(self: &Arc<Self>) -> Arc<dyn RemoteClient> {
        self.clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn lookup(&self, args: &[CallValue]) -> anyhow::Result<CallValue> {
        self.registry_lookups.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.registry_failures) {
            anyhow::bail!("registry lookup timed out");
        }
        match args {
            [CallValue::String(name)] if name == registry::FTSO_V2 => {
                Ok(CallValue::Address(FTSO_ADDRESS))
            }
            [CallValue::String(_)] => Ok(CallValue::Address(Address::ZERO)),
            _ => anyhow::bail!("bad registry arguments"),
        }
    }

    async fn read_feed(&self, args: &[CallValue]) -> anyhow::Result<CallValue> {
        let feed = match args {
            [CallValue::Bytes(bytes)] => FeedId::from_bytes(bytes)?,
            _ => anyhow::bail!("bad feed arguments"),
        };
        let n = self.price_reads.fetch_add(1, Ordering::SeqCst) as u64;

        let delay = self.delays.lock().get(feed.name()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if Self::take_failure(&self.read_failures) || self.failing_feeds.lock().contains(feed.name()) {
            anyhow::bail!("execution reverted");
        }

        let (raw, decimals) = self
            .prices
            .lock()
            .get(feed.name())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown feed {}", feed))?;

        Ok(CallValue::Tuple(vec![
            CallValue::Uint(raw),
            CallValue::Int(i128::from(decimals)),
            CallValue::Uint(u128::from(BASE_TIMESTAMP + n)),
        ]))
    }
}

#[async_trait::async_trait]
impl RemoteClient for MockChain {
    async fn call(
        &self,
        contract: Address,
        signature: &str,
        args: &[CallValue],
    ) -> anyhow::Result<CallValue> {
        match signature {
            registry::LOOKUP_SIGNATURE => self.lookup(args),
            ftso::GET_FEED_BY_ID => {
                anyhow::ensure!(contract == FTSO_ADDRESS, "no code at {}", contract);
                self.read_feed(args).await
            }
            other => anyhow::bail!("unexpected call {}", other),
        }
    }

    async fn block_number(&self) -> anyhow::Result<u64> {
        Ok(self.block.load(Ordering::SeqCst))
    }
}
