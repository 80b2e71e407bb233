//! Liquidation-monitoring worker
//!
//! Ingests streamed candidate balance snapshots and price updates,
//! maintains live per-account risk state partitioned across independent
//! shards, detects when an account crosses into or out of a liquidatable
//! condition, and forwards liquidate/cancel instructions to the downstream
//! transaction manager over a single serialized pipeline.
//!
//! Data flow:
//! inbound stream → [`server`] decodes → [`dispatcher`] routes →
//! [`shard`] recomputes shortfall → decision → [`delegator`] → txmanager.

pub mod config;
pub mod delegator;
pub mod dispatcher;
pub mod events;
pub mod server;
pub mod shard;
pub mod shortfall;
