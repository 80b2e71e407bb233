//! Price and exchange-rate update shapes
//!
//! A price snapshot carries the minimum and maximum observed USD price per
//! token (the reporter publishes both ends of its confidence window), plus
//! any exchange rates that arrived with it. Rate-only snapshots carry just
//! the exchange rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::token::Token;

/// A single observed USD price for a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub token: Token,
    /// Observed price in USD.
    pub price_usd: Decimal,
}

impl TokenPrice {
    pub fn new(token: Token, price_usd: Decimal) -> Self {
        Self { token, price_usd }
    }
}

/// One inbound price snapshot.
///
/// Entries named here overwrite the corresponding cache slots; tokens not
/// named are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PriceUpdate {
    /// Latest minimum observed prices.
    pub min_prices: Vec<TokenPrice>,
    /// Latest maximum observed prices.
    pub max_prices: Vec<TokenPrice>,
    /// Exchange rates between protocol units and underlying units.
    #[serde(default)]
    pub exchange_rates: BTreeMap<Token, Decimal>,
}

/// One inbound rate-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RateUpdate {
    pub exchange_rates: BTreeMap<Token, Decimal>,
}
