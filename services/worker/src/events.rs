//! Shard-bound event types
//!
//! Every shard waits on a single queue, so the inbound surface is a tagged
//! union: an event with no recognizable payload is unrepresentable, and the
//! shard loop matches exhaustively.

use std::sync::Arc;

use types::candidate::Candidate;
use types::price::{PriceUpdate, RateUpdate};

/// An event enqueued onto a shard's channel.
///
/// Broadcast payloads are shared behind `Arc` so fanning one update out to
/// N shards does not clone the price lists N times.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Fresh balances for one account owned by this shard.
    Candidate(Candidate),
    /// Market-wide price snapshot, delivered to every shard.
    Prices(Arc<PriceUpdate>),
    /// Market-wide exchange-rate snapshot, delivered to every shard.
    Rates(Arc<RateUpdate>),
}
