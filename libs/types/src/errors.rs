//! Error types for the liquidation worker
//!
//! Shared error taxonomy using thiserror.

use thiserror::Error;

/// Failure to hand an event to a shard or the delegation channel.
///
/// Dispatch failures do not crash the dispatcher; they are reported to the
/// caller, which abandons the affected stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("shard {shard} is unavailable (channel closed)")]
    ShardUnavailable { shard: usize },

    #[error("delegation channel closed")]
    DelegationClosed,
}

/// Invalid or missing process configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("shard count must be at least 1")]
    ZeroShards,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::ShardUnavailable { shard: 3 };
        assert_eq!(err.to_string(), "shard 3 is unavailable (channel closed)");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "NUM_SHARDS".to_string(),
            value: "banana".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for NUM_SHARDS: banana");
    }
}
