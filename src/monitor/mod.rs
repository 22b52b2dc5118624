//! Per-address transaction monitoring.
//!
//! # Data Flow
//! ```text
//! start(address, callback) / subscribe(address)
//!     → head block read (activation fails if the node is unreachable)
//!     → watch.rs poll task (one per address)
//!     → scan_mined_block for each new block (missing body → back off, retry)
//!     → callback / bounded subscription channel
//! ```
//!
//! # Design Decisions
//! - One watch per address; starting an active address is a no-op
//! - Stop is cooperative: a `watch` channel raced against every await
//! - Watches carry an id so a stale subscription never stops a newer watch

mod watch;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{mpsc, watch as signal};

use crate::blockchain::chain::ChainClient;
use crate::blockchain::format::FormattedTransaction;
use crate::config::schema::MonitorConfig;
use crate::errors::failure::HandlerResult;
use crate::observability::metrics;

/// Receives each matching transaction. Awaited before the next delivery.
pub type DeliveryCallback =
    Arc<dyn Fn(FormattedTransaction) -> BoxFuture<'static, ()> + Send + Sync>;

/// Poll timing for every watch.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub subscription_buffer: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            error_backoff: Duration::from_millis(config.error_backoff_ms),
            subscription_buffer: config.subscription_buffer.max(1),
        }
    }
}

struct WatchEntry {
    id: u64,
    stop: signal::Sender<bool>,
}

/// Set of active watches. Cheap to clone; clones share the same set.
#[derive(Clone)]
pub struct TransactionMonitor {
    chain: Arc<dyn ChainClient>,
    settings: MonitorSettings,
    watches: Arc<DashMap<Address, WatchEntry>>,
    next_id: Arc<AtomicU64>,
}

impl TransactionMonitor {
    pub fn new(chain: Arc<dyn ChainClient>, settings: MonitorSettings) -> Self {
        Self {
            chain,
            settings,
            watches: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Begin watching `address`. Returns `false` if it is already watched.
    pub async fn start(&self, address: Address, callback: DeliveryCallback) -> HandlerResult<bool> {
        Ok(self.activate(address, callback).await?.is_some())
    }

    /// Watch `address` into a bounded channel. `None` if already watched.
    pub async fn subscribe(&self, address: Address) -> HandlerResult<Option<Subscription>> {
        let (tx, receiver) = mpsc::channel(self.settings.subscription_buffer);
        let callback: DeliveryCallback = Arc::new(move |transaction: FormattedTransaction| {
            let tx = tx.clone();
            async move {
                // A closed receiver means the subscription is being dropped,
                // which stops the watch on its own.
                let _ = tx.send(transaction).await;
            }
            .boxed()
        });

        Ok(self
            .activate(address, callback)
            .await?
            .map(|id| Subscription {
                address,
                id,
                receiver,
                monitor: self.clone(),
            }))
    }

    async fn activate(&self, address: Address, callback: DeliveryCallback) -> HandlerResult<Option<u64>> {
        if self.watches.contains_key(&address) {
            tracing::debug!(address = %address, "Address already monitored");
            return Ok(None);
        }

        let head = self.chain.get_block_number().await?;
        let (stop_tx, stop_rx) = signal::channel(false);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        match self.watches.entry(address) {
            Entry::Occupied(_) => return Ok(None),
            Entry::Vacant(slot) => {
                slot.insert(WatchEntry { id, stop: stop_tx });
            }
        }
        metrics::record_active_watches(self.watches.len());

        tracing::info!(address = %address, watch_id = id, from_block = head, "Transaction watch started");

        let task = watch::WatchTask {
            chain: self.chain.clone(),
            address,
            last_seen: head,
            settings: self.settings,
            callback,
        };
        tokio::spawn(task.run(stop_rx));
        Ok(Some(id))
    }

    /// Stop watching `address`. Returns `false` if it was not watched.
    pub fn stop(&self, address: Address) -> bool {
        self.remove_where(address, |_| true)
    }

    fn stop_watch(&self, address: Address, id: u64) -> bool {
        self.remove_where(address, |entry| entry.id == id)
    }

    fn remove_where(&self, address: Address, pred: impl FnOnce(&WatchEntry) -> bool) -> bool {
        let Some((_, entry)) = self.watches.remove_if(&address, |_, entry| pred(entry)) else {
            return false;
        };
        let _ = entry.stop.send(true);
        metrics::record_active_watches(self.watches.len());
        tracing::info!(address = %address, watch_id = entry.id, "Transaction watch stopped");
        true
    }

    /// Stop every watch. Used on shutdown.
    pub fn stop_all(&self) {
        let addresses: Vec<Address> = self.watches.iter().map(|e| *e.key()).collect();
        for address in addresses {
            self.stop(address);
        }
    }

    pub fn is_active(&self, address: Address) -> bool {
        self.watches.contains_key(&address)
    }

    pub fn active_count(&self) -> usize {
        self.watches.len()
    }
}

impl std::fmt::Debug for TransactionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionMonitor")
            .field("settings", &self.settings)
            .field("active", &self.watches.len())
            .finish()
    }
}

/// A watch delivering into a channel. Dropping it stops the watch.
#[derive(Debug)]
pub struct Subscription {
    address: Address,
    id: u64,
    receiver: mpsc::Receiver<FormattedTransaction>,
    monitor: TransactionMonitor,
}

impl Subscription {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Next matching transaction; `None` once the watch has stopped.
    pub async fn recv(&mut self) -> Option<FormattedTransaction> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.monitor.stop_watch(self.address, self.id);
    }
}
