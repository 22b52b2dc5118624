//! The poll loop behind one watch.
//!
//! `last_seen` advances after each fully delivered block, not once per tick.
//! A tick that fails part way therefore keeps the blocks it already finished
//! and only the failed block and those after it are retried. A block the node
//! reports but cannot serve fails the tick before `last_seen` moves past it.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::watch;
use tokio::time::sleep;

use crate::blockchain::chain::ChainClient;
use crate::blockchain::history::scan_mined_block;
use crate::blockchain::types::ChainResult;
use crate::monitor::{DeliveryCallback, MonitorSettings};
use crate::observability::metrics;

pub(super) struct WatchTask {
    pub chain: Arc<dyn ChainClient>,
    pub address: Address,
    /// Highest block already scanned.
    pub last_seen: u64,
    pub settings: MonitorSettings,
    pub callback: DeliveryCallback,
}

impl WatchTask {
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        loop {
            if *stop.borrow() {
                break;
            }

            let outcome = tokio::select! {
                _ = stop.changed() => break,
                outcome = self.tick() => outcome,
            };

            let pause = match outcome {
                Ok(delivered) => {
                    metrics::record_monitor_tick("ok");
                    if delivered > 0 {
                        tracing::debug!(
                            address = %self.address,
                            delivered,
                            last_seen = self.last_seen,
                            "Watch delivered transactions"
                        );
                    }
                    self.settings.poll_interval
                }
                Err(e) => {
                    metrics::record_monitor_tick("error");
                    tracing::warn!(
                        address = %self.address,
                        last_seen = self.last_seen,
                        error = %e,
                        "Watch tick failed, backing off"
                    );
                    self.settings.error_backoff
                }
            };

            tokio::select! {
                _ = stop.changed() => break,
                _ = sleep(pause) => {}
            }
        }
        tracing::debug!(address = %self.address, "Watch task exited");
    }

    /// Scan every block after `last_seen` up to the head, in order.
    /// `last_seen` advances per block so a failure part way through never
    /// re-delivers a finished block.
    async fn tick(&mut self) -> ChainResult<usize> {
        let head = self.chain.get_block_number().await?;
        let mut delivered = 0;
        while self.last_seen < head {
            let number = self.last_seen + 1;
            let found = scan_mined_block(self.chain.as_ref(), self.address, number).await?;
            for transaction in found {
                (self.callback)(transaction).await;
                metrics::record_monitor_delivery();
                delivered += 1;
            }
            self.last_seen = number;
        }
        Ok(delivered)
    }
}
