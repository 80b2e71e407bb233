//! Types library for the liquidation worker
//!
//! Provides the core type definitions shared between the worker service
//! and anything that speaks its wire format: the supported token set,
//! the static protocol parameter table, price/rate update shapes,
//! candidate (account) snapshots, and the liquidate/cancel decisions
//! emitted toward the transaction manager.
//!
//! # Modules
//! - `token`: fixed enumeration of supported collateral markets
//! - `params`: immutable protocol parameter table
//! - `price`: price and exchange-rate update shapes
//! - `candidate`: addresses and per-token balance snapshots
//! - `decision`: liquidate/cancel instructions
//! - `errors`: error taxonomy

pub mod candidate;
pub mod decision;
pub mod errors;
pub mod params;
pub mod price;
pub mod token;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::candidate::*;
    pub use crate::decision::*;
    pub use crate::errors::*;
    pub use crate::params::*;
    pub use crate::price::*;
    pub use crate::token::*;
}
