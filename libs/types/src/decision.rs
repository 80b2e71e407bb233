//! Liquidate/cancel decisions
//!
//! Produced by a shard when an account's shortfall sign changes, consumed
//! by the delegation channel, and forwarded to the transaction manager.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::candidate::Address;
use crate::token::Token;

/// Context the transaction manager needs to act on a liquidatable account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationCandidate {
    pub address: Address,
    /// Debt minus collateral in USD at evaluation time. Always positive
    /// when this instruction is emitted.
    pub shortfall: Decimal,
    /// Market with the largest debt leg — the borrow to repay.
    pub repay_token: Token,
    /// Market with the largest collateral leg — the supply to seize.
    pub seize_token: Token,
}

/// An instruction bound for the transaction manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Account crossed into the liquidatable region.
    Liquidate(LiquidationCandidate),
    /// Previously submitted account crossed back to healthy.
    Cancel { address: Address },
}

impl Decision {
    /// The account this decision concerns.
    pub fn address(&self) -> &Address {
        match self {
            Decision::Liquidate(candidate) => &candidate.address,
            Decision::Cancel { address } => address,
        }
    }
}
