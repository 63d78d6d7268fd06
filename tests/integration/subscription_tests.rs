//! Polling subscriptions driven through the price feed

use crate::mock_chain::MockChain;
use oracle_feeds::{FeedSettings, GetOptions, Network, PriceFeed, PriceQuote};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn coston2_feed(chain: &Arc<MockChain>) -> PriceFeed {
    PriceFeed::new(chain.client(), FeedSettings::for_network(Network::Coston2).unwrap())
}

fn collector() -> (Arc<Mutex<Vec<PriceQuote>>>, impl Fn(PriceQuote) + Send + Sync + 'static) {
    let quotes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&quotes);
    (quotes, move |quote| sink.lock().push(quote))
}

fn counter() -> (Arc<AtomicUsize>, impl Fn(PriceQuote) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&count);
    (count, move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test(start_paused = true)]
async fn test_initial_delivery_then_fresh_value() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    let (quotes, callback) = collector();

    let sub = feed
        .subscribe("ETH", callback, Some(Duration::from_millis(2000)))
        .unwrap();
    assert_eq!(sub.topic(), "ETH/USD");

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(quotes.lock().len(), 1);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    let quotes = quotes.lock();
    assert_eq!(quotes.len(), 2);
    // Same price, but read again from the chain
    assert_eq!(quotes[0].value, quotes[1].value);
    assert!(quotes[1].timestamp > quotes[0].timestamp);
    assert_eq!(chain.price_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_subscriptions_on_same_symbol_are_independent() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    let (fast_count, fast_cb) = counter();
    let (slow_count, slow_cb) = counter();

    let fast = feed
        .subscribe("BTC", fast_cb, Some(Duration::from_millis(1000)))
        .unwrap();
    let slow = feed
        .subscribe("BTC", slow_cb, Some(Duration::from_millis(5000)))
        .unwrap();
    assert_ne!(fast.id(), slow.id());
    assert_eq!(feed.active_subscriptions(), 2);

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(fast_count.load(Ordering::SeqCst), 11);
    assert_eq!(slow_count.load(Ordering::SeqCst), 3);

    fast.unsubscribe();
    assert!(slow.is_active());
    assert_eq!(feed.active_subscriptions(), 1);

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(fast_count.load(Ordering::SeqCst), 11);
    assert_eq!(slow_count.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_failed_tick_does_not_stop_schedule() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    let (quotes, callback) = collector();

    let _sub = feed
        .subscribe("FLR", callback, Some(Duration::from_millis(1000)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(quotes.lock().len(), 1);

    chain.fail_next_reads(1);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(quotes.lock().len(), 1);
    assert_eq!(feed.metrics().tick_failures.get(), 1);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(quotes.lock().len(), 2);
    assert_eq!(chain.price_reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_delays_ticks_without_overlap() {
    let chain = MockChain::new();
    chain.set_delay("BTC/USD", Duration::from_millis(2500));
    let feed = coston2_feed(&chain);
    let (count, callback) = counter();

    let _sub = feed
        .subscribe("BTC", callback, Some(Duration::from_millis(1000)))
        .unwrap();

    // Reads start at 0, 2500 and 5000 ms; missed ticks are not replayed
    tokio::time::sleep(Duration::from_millis(6000)).await;
    assert_eq!(chain.price_reads(), 3);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_twice_is_harmless() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    let (count, callback) = counter();

    let sub = feed.subscribe("BTC", callback, None).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    sub.unsubscribe();
    sub.unsubscribe();
    assert!(!sub.is_active());
    assert_eq!(feed.active_subscriptions(), 0);
    assert_eq!(feed.metrics().active_subscriptions.get(), 0);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_reads_bypass_cache() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    feed.get_price("BTC", GetOptions::default()).await.unwrap();

    let (quotes, callback) = collector();
    let _sub = feed
        .subscribe("BTC", callback, Some(Duration::from_millis(1000)))
        .unwrap();
    chain.set_price("BTC/USD", 6_800_000, 2);
    tokio::time::sleep(Duration::from_millis(1010)).await;

    assert_eq!(chain.price_reads(), 3);
    assert_eq!(quotes.lock().len(), 2);
    assert_eq!(feed.metrics().cache_hits.get(), 0);

    // Polled quotes refresh the cache for ordinary reads
    let cached = feed.get_price("BTC", GetOptions::default()).await.unwrap();
    assert_eq!(cached.raw_value, 6_800_000);
}

#[tokio::test(start_paused = true)]
async fn test_default_interval_comes_from_settings() {
    let chain = MockChain::new();
    let mut settings = FeedSettings::for_network(Network::Coston2).unwrap();
    settings.default_interval = Duration::from_millis(250);
    let feed = PriceFeed::new(chain.client(), settings);
    let (count, callback) = counter();

    let _sub = feed.subscribe("ETH", callback, None).unwrap();
    tokio::time::sleep(Duration::from_millis(1010)).await;

    assert_eq!(count.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_subscriptions() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    let (count, callback) = counter();

    let sub = feed
        .subscribe("BTC", callback, Some(Duration::from_millis(1000)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    feed.shutdown();
    assert!(!sub.is_active());
    assert_eq!(feed.active_subscriptions(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    // Handles outlive the feed without complaint
    sub.unsubscribe();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_feed_cancels_subscriptions() {
    let chain = MockChain::new();
    let feed = coston2_feed(&chain);
    let (count, callback) = counter();

    let sub = feed
        .subscribe("ETH", callback, Some(Duration::from_millis(1000)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(feed);

    assert!(!sub.is_active());
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(chain.price_reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_during_slow_read_suppresses_delivery() {
    let chain = MockChain::new();
    chain.set_delay("BTC/USD", Duration::from_millis(500));
    let feed = coston2_feed(&chain);
    let (count, callback) = counter();

    let sub = feed
        .subscribe("BTC", callback, Some(Duration::from_millis(1000)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    // First read delivered at 500ms, second read is in flight
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(chain.price_reads(), 2);

    sub.unsubscribe();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(chain.price_reads(), 2);
}
