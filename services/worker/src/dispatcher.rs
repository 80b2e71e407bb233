//! Worker pool dispatcher
//!
//! Owns N shards, each bound to its own bounded channel and tokio task —
//! an arena of shards indexed by partition id. Candidate-scoped events are
//! routed to exactly one shard by a deterministic hash of the address;
//! market-wide events are fanned out to every shard.
//!
//! The channel graph is acyclic (inbound → shard → delegation), so a full
//! shard channel can only stall producers, never deadlock the pool.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use xxhash_rust::xxh64::xxh64;

use types::candidate::{Address, CandidateBatch};
use types::decision::Decision;
use types::errors::DispatchError;
use types::params::ProtocolParams;
use types::price::{PriceUpdate, RateUpdate};

use crate::events::WorkerEvent;
use crate::shard::{run_shard, Shard};

/// Map an address to its owning shard.
///
/// Pure and deterministic: the same address and shard count always route
/// to the same shard for the lifetime of the process. Changing the shard
/// count requires a restart.
pub fn partition(address: &Address, shard_count: usize) -> usize {
    debug_assert!(shard_count > 0);
    (xxh64(address.as_str().as_bytes(), 0) % shard_count as u64) as usize
}

/// The shard pool: routing and broadcast entry points.
pub struct Dispatcher {
    senders: Vec<mpsc::Sender<WorkerEvent>>,
    handles: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Build and start `shard_count` shards, each with its own channel of
    /// `channel_capacity` events and its own task. Every shard gets a clone
    /// of the delegation sender and a handle to the shared immutable
    /// parameter table.
    pub fn spawn(
        shard_count: usize,
        channel_capacity: usize,
        params: Arc<ProtocolParams>,
        decision_tx: mpsc::Sender<Decision>,
    ) -> Self {
        assert!(shard_count > 0, "dispatcher needs at least one shard");

        let mut senders = Vec::with_capacity(shard_count);
        let mut handles = Vec::with_capacity(shard_count);

        for id in 0..shard_count {
            let (tx, rx) = mpsc::channel(channel_capacity);
            let shard = Shard::new(id, Arc::clone(&params), decision_tx.clone());
            handles.push(tokio::spawn(run_shard(shard, rx)));
            senders.push(tx);
        }

        info!(shards = shard_count, capacity = channel_capacity, "dispatcher started");
        Self { senders, handles }
    }

    pub fn shard_count(&self) -> usize {
        self.senders.len()
    }

    /// Route each candidate in the batch to its owning shard.
    ///
    /// Blocks (asynchronously) when a shard's channel is full. A closed
    /// shard channel is reported as a dispatch failure; the dispatcher
    /// itself stays up.
    pub async fn route_candidates(&self, batch: CandidateBatch) -> Result<(), DispatchError> {
        for candidate in batch.candidates {
            let shard = partition(&candidate.address, self.senders.len());
            self.senders[shard]
                .send(WorkerEvent::Candidate(candidate))
                .await
                .map_err(|_| {
                    warn!(shard, "candidate dispatch failed: shard channel closed");
                    DispatchError::ShardUnavailable { shard }
                })?;
        }
        Ok(())
    }

    /// Deliver a price snapshot to every shard, once each, in shard order.
    pub async fn broadcast_prices(&self, update: PriceUpdate) -> Result<(), DispatchError> {
        let update = Arc::new(update);
        self.broadcast(|| WorkerEvent::Prices(Arc::clone(&update))).await
    }

    /// Deliver an exchange-rate snapshot to every shard.
    pub async fn broadcast_rates(&self, update: RateUpdate) -> Result<(), DispatchError> {
        let update = Arc::new(update);
        self.broadcast(|| WorkerEvent::Rates(Arc::clone(&update))).await
    }

    async fn broadcast(
        &self,
        mut event: impl FnMut() -> WorkerEvent,
    ) -> Result<(), DispatchError> {
        for (shard, sender) in self.senders.iter().enumerate() {
            sender.send(event()).await.map_err(|_| {
                warn!(shard, "broadcast failed: shard channel closed");
                DispatchError::ShardUnavailable { shard }
            })?;
        }
        Ok(())
    }

    /// Close every shard channel and wait for the shard tasks to drain
    /// their queues and exit.
    pub async fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            // A panicked shard already logged its failure; shutdown proceeds.
            let _ = handle.await;
        }
        info!("dispatcher stopped");
    }
}
