//! Polling subscriptions
//!
//! Turns a pull-style fetch into a push-style callback stream. Every call to
//! `subscribe` gets its own task, cancellation token and cadence, even when
//! several subscriptions share a topic.
//!
//! Each subscription delivers one value right away, then one per interval.
//! Ticks of one subscription never overlap: the next wait starts only after
//! the previous fetch-and-deliver has finished. Fetch errors and callback
//! panics are logged and the subscription keeps running.

use crate::error::{SdkError, SdkResult};
use crate::metrics::FeedMetrics;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Timers reject zero periods
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Unique identifier of one subscribe call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active subscriptions, keyed per subscribe call
struct SubscriptionTable {
    entries: Mutex<HashMap<SubscriptionId, CancellationToken>>,
    metrics: Option<Arc<FeedMetrics>>,
}

impl SubscriptionTable {
    fn insert(&self, id: SubscriptionId, token: CancellationToken) {
        self.entries.lock().insert(id, token);
        if let Some(metrics) = &self.metrics {
            metrics.active_subscriptions.inc();
        }
    }

    fn remove(&self, id: SubscriptionId) -> Option<CancellationToken> {
        let removed = self.entries.lock().remove(&id);
        if removed.is_some() {
            if let Some(metrics) = &self.metrics {
                metrics.active_subscriptions.dec();
            }
        }
        removed
    }

    fn drain(&self) -> Vec<(SubscriptionId, CancellationToken)> {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        if let Some(metrics) = &self.metrics {
            metrics.active_subscriptions.sub(drained.len() as i64);
        }
        drained
    }
}

/// Handle returned by `subscribe`
///
/// Dropping the handle does not cancel the subscription; call
/// [`Subscription::unsubscribe`] or shut the owning manager down.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    topic: Arc<str>,
    token: CancellationToken,
    table: Weak<SubscriptionTable>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop this subscription
    ///
    /// Idempotent, and safe to call from inside the subscription's own
    /// callback. Called from the callback or the polling task's thread, no
    /// delivery follows. Called from another thread, a delivery that already
    /// passed its cancellation check may still complete.
    pub fn unsubscribe(&self) {
        let was_active = !self.token.is_cancelled();
        self.token.cancel();
        if let Some(table) = self.table.upgrade() {
            table.remove(self.id);
        }
        if was_active {
            tracing::debug!(topic = %self.topic, subscription = %self.id, "Unsubscribed");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Manager for independent polling loops
pub struct PollingSubscriptionManager {
    table: Arc<SubscriptionTable>,
    default_interval: Duration,
}

impl PollingSubscriptionManager {
    /// Create a manager with the interval used when callers pass `None`
    pub fn new(default_interval: Duration) -> Self {
        Self {
            table: Arc::new(SubscriptionTable {
                entries: Mutex::new(HashMap::new()),
                metrics: None,
            }),
            default_interval,
        }
    }

    /// Create a manager that reports the active count and tick failures
    pub fn with_metrics(default_interval: Duration, metrics: Arc<FeedMetrics>) -> Self {
        Self {
            table: Arc::new(SubscriptionTable {
                entries: Mutex::new(HashMap::new()),
                metrics: Some(metrics),
            }),
            default_interval,
        }
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Start polling `fetch` and delivering successes to `callback`
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<V, F, Fut, C>(
        &self,
        topic: &str,
        fetch: F,
        callback: C,
        interval: Option<Duration>,
    ) -> SdkResult<Subscription>
    where
        V: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SdkResult<V>> + Send + 'static,
        C: Fn(V) + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SdkError::not_initialized("subscriptions require a running tokio runtime").with_cause(e)
        })?;

        let period = interval.unwrap_or(self.default_interval).max(MIN_INTERVAL);
        let id = SubscriptionId::new();
        let token = CancellationToken::new();
        let topic: Arc<str> = Arc::from(topic);

        self.table.insert(id, token.clone());

        tracing::debug!(
            topic = %topic,
            subscription = %id,
            interval_ms = period.as_millis() as u64,
            "Subscription started"
        );

        let poller = Poller {
            id,
            topic: Arc::clone(&topic),
            fetch,
            callback,
            token: token.clone(),
            metrics: self.table.metrics.clone(),
        };
        let first_tick = Instant::now() + period;
        runtime.spawn(poller.run(first_tick, period));

        Ok(Subscription {
            id,
            topic,
            token,
            table: Arc::downgrade(&self.table),
        })
    }

    /// Number of subscriptions still polling
    pub fn active_count(&self) -> usize {
        self.table.entries.lock().len()
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.table.entries.lock().contains_key(&id)
    }

    /// Cancel every subscription and empty the table
    pub fn shutdown_all(&self) {
        let drained = self.table.drain();
        let count = drained.len();
        for (_, token) in drained {
            token.cancel();
        }
        if count > 0 {
            tracing::info!(cancelled = count, "All subscriptions cancelled");
        }
    }
}

impl Drop for PollingSubscriptionManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// One subscription's polling loop
struct Poller<F, C> {
    id: SubscriptionId,
    topic: Arc<str>,
    fetch: F,
    callback: C,
    token: CancellationToken,
    metrics: Option<Arc<FeedMetrics>>,
}

impl<V, F, Fut, C> Poller<F, C>
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SdkResult<V>> + Send + 'static,
    C: Fn(V) + Send + Sync + 'static,
{
    async fn run(self, first_tick: Instant, period: Duration) {
        self.tick().await;

        let mut ticker = tokio::time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.tick().await;
        }

        tracing::trace!(topic = %self.topic, subscription = %self.id, "Polling loop stopped");
    }

    /// Fetch once and deliver the result unless cancelled meanwhile
    async fn tick(&self) {
        if self.token.is_cancelled() {
            return;
        }

        // In-flight reads run to completion; only delivery is suppressed
        let result = match AssertUnwindSafe((self.fetch)()).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(topic = %self.topic, subscription = %self.id, "Subscription fetch panicked");
                self.record_failure();
                return;
            }
        };

        if self.token.is_cancelled() {
            return;
        }

        match result {
            Ok(value) => {
                let delivered =
                    std::panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(value)));
                if delivered.is_err() {
                    tracing::error!(
                        topic = %self.topic,
                        subscription = %self.id,
                        "Subscription callback panicked"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    topic = %self.topic,
                    subscription = %self.id,
                    error = %e,
                    "Subscription tick failed"
                );
                self.record_failure();
            }
        }
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.tick_failures.inc();
        }
    }
}
