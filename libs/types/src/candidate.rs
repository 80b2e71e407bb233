//! Candidate accounts and their balance snapshots
//!
//! A candidate is an address with per-token raw supply and borrow balances
//! in base units. Balances arrive piecemeal from the delegator service; the
//! worker only ever keeps the most recently received snapshot per address.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::token::Token;

/// An account address.
///
/// Opaque identifier, normalized to lowercase so that routing and map
/// lookups are insensitive to checksum casing. Used both as the partition
/// key and as the per-shard map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A monitored account: address plus per-token balances.
///
/// Absent tokens mean a zero balance. Balances are raw base-unit values;
/// the exchange rate converts supply balances to underlying units during
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub address: Address,
    #[serde(default)]
    pub supply_balances: BTreeMap<Token, Decimal>,
    #[serde(default)]
    pub borrow_balances: BTreeMap<Token, Decimal>,
}

impl Candidate {
    /// Create a candidate with no balances.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            supply_balances: BTreeMap::new(),
            borrow_balances: BTreeMap::new(),
        }
    }

    /// Supply balance for a token (absent ⇒ zero).
    pub fn supply_of(&self, token: Token) -> Decimal {
        self.supply_balances
            .get(&token)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Borrow balance for a token (absent ⇒ zero).
    pub fn borrow_of(&self, token: Token) -> Decimal {
        self.borrow_balances
            .get(&token)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Set the supply balance for a token.
    pub fn set_supply(&mut self, token: Token, balance: Decimal) -> &mut Self {
        self.supply_balances.insert(token, balance);
        self
    }

    /// Set the borrow balance for a token.
    pub fn set_borrow(&mut self, token: Token, balance: Decimal) -> &mut Self {
        self.borrow_balances.insert(token, balance);
        self
    }
}

/// One inbound batch of candidate snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
}
