//! Contract address resolution
//!
//! Maps logical contract names (`"FtsoV2"`) to addresses through the
//! network's contract registry. Each name is looked up at most once while a
//! lookup is in flight; concurrent callers share that lookup. Successful
//! results are kept for the life of the resolver. A failed lookup is
//! forgotten before its error is handed back, so the next call retries.

use crate::client::{Address, CallValue, RemoteClient};
use crate::constants::registry;
use crate::error::{SdkError, SdkResult};
use crate::metrics::FeedMetrics;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type PendingLookup = Shared<BoxFuture<'static, SdkResult<Address>>>;

/// Per-name resolution state. Absent from the table means unresolved.
enum Slot {
    /// Lookup in flight; `attempt` tells overlapping attempts apart
    Resolving { attempt: u64, lookup: PendingLookup },
    Resolved(Address),
}

/// Registry-backed address resolver
pub struct AddressResolver {
    client: Arc<dyn RemoteClient>,
    registry: Address,
    slots: Mutex<HashMap<String, Slot>>,
    next_attempt: AtomicU64,
    metrics: Option<Arc<FeedMetrics>>,
}

impl AddressResolver {
    /// Create a resolver for the given registry contract
    pub fn new(client: Arc<dyn RemoteClient>, registry: Address) -> Self {
        Self {
            client,
            registry,
            slots: Mutex::new(HashMap::new()),
            next_attempt: AtomicU64::new(0),
            metrics: None,
        }
    }

    /// Record lookups and failures in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<FeedMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    /// Resolve a logical name to its address
    pub async fn resolve(&self, logical_name: &str) -> SdkResult<Address> {
        if logical_name.trim().is_empty() {
            return Err(SdkError::configuration("logical contract name is empty"));
        }

        let (attempt, lookup) = {
            let mut slots = self.slots.lock();
            match slots.get(logical_name) {
                Some(Slot::Resolved(address)) => return Ok(*address),
                Some(Slot::Resolving { attempt, lookup }) => (*attempt, lookup.clone()),
                None => {
                    let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
                    let lookup = self.start_lookup(logical_name);
                    slots.insert(
                        logical_name.to_string(),
                        Slot::Resolving {
                            attempt,
                            lookup: lookup.clone(),
                        },
                    );
                    (attempt, lookup)
                }
            }
        };

        let result = lookup.await;
        self.settle(logical_name, attempt, &result);
        result
    }

    /// Address already resolved for `logical_name`, without a remote call
    pub fn cached(&self, logical_name: &str) -> Option<Address> {
        match self.slots.lock().get(logical_name) {
            Some(Slot::Resolved(address)) => Some(*address),
            _ => None,
        }
    }

    /// Drop a memoized address so the next `resolve` asks the registry again
    pub fn forget(&self, logical_name: &str) {
        let mut slots = self.slots.lock();
        if matches!(slots.get(logical_name), Some(Slot::Resolved(_))) {
            slots.remove(logical_name);
        }
    }

    fn start_lookup(&self, logical_name: &str) -> PendingLookup {
        let client = Arc::clone(&self.client);
        let registry = self.registry;
        let name = logical_name.to_string();
        let metrics = self.metrics.clone();

        async move {
            tracing::debug!(name = %name, registry = %registry, "Resolving contract address");
            if let Some(metrics) = &metrics {
                metrics.record_remote_call(registry::LOOKUP_SIGNATURE);
            }

            let value = client
                .call(
                    registry,
                    registry::LOOKUP_SIGNATURE,
                    &[CallValue::String(name.clone())],
                )
                .await
                .map_err(|e| {
                    SdkError::resolution(format!("registry lookup for {} failed", name))
                        .with_client_cause(e)
                })?;

            let address = value.as_address().ok_or_else(|| {
                SdkError::resolution(format!(
                    "registry returned a non-address value for {}",
                    name
                ))
            })?;

            if address.is_zero() {
                return Err(SdkError::resolution(format!(
                    "{} is not registered (zero address)",
                    name
                )));
            }

            Ok(address)
        }
        .boxed()
        .shared()
    }

    /// Record the outcome of `attempt`, unless a newer attempt replaced it
    fn settle(&self, logical_name: &str, attempt: u64, result: &SdkResult<Address>) {
        let mut slots = self.slots.lock();
        let current = match slots.get(logical_name) {
            Some(Slot::Resolving { attempt: current, .. }) => *current,
            _ => return,
        };
        if current != attempt {
            return;
        }

        match result {
            Ok(address) => {
                tracing::info!(name = logical_name, address = %address, "Contract address resolved");
                slots.insert(logical_name.to_string(), Slot::Resolved(*address));
            }
            Err(e) => {
                tracing::warn!(name = logical_name, error = %e, "Contract address resolution failed");
                if let Some(metrics) = &self.metrics {
                    metrics.resolution_failures.inc();
                }
                slots.remove(logical_name);
            }
        }
    }
}
