//! Process configuration
//!
//! Read once from the environment at startup and immutable afterwards.
//! Changing the shard count requires a restart — the partition function
//! must stay stable for the process lifetime.

use std::env;
use std::net::SocketAddr;

use types::errors::ConfigError;

/// Worker process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Address the inbound boundary listens on.
    pub listen_addr: SocketAddr,
    /// Address of the downstream transaction manager.
    pub txmanager_addr: String,
    /// Number of shards (threads of control) in the worker pool.
    pub shard_count: usize,
    /// Capacity of each shard's inbound channel and of the delegation
    /// channel.
    pub channel_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            txmanager_addr: "localhost:8081".to_string(),
            shard_count: 4,
            channel_capacity: 1024,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for unset keys.
    ///
    /// Keys: `WORKER_LISTEN_ADDR`, `TXMANAGER_ADDR`, `NUM_SHARDS`,
    /// `CHANNEL_CAPACITY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let listen_addr = match env::var("WORKER_LISTEN_ADDR") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "WORKER_LISTEN_ADDR".to_string(),
                value,
            })?,
            Err(_) => defaults.listen_addr,
        };

        let txmanager_addr =
            env::var("TXMANAGER_ADDR").unwrap_or(defaults.txmanager_addr);

        let shard_count = parse_env("NUM_SHARDS", defaults.shard_count)?;
        if shard_count == 0 {
            return Err(ConfigError::ZeroShards);
        }

        let channel_capacity = parse_env("CHANNEL_CAPACITY", defaults.channel_capacity)?;

        Ok(Self {
            listen_addr,
            txmanager_addr,
            shard_count,
            channel_capacity,
        })
    }
}

fn parse_env(key: &str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
