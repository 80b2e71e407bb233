//! Supported token markets
//!
//! The set of collateral markets the worker monitors is fixed at compile
//! time. Every per-token cache (prices, exchange rates, balances) is keyed
//! by this enum, so an unsupported market is unrepresentable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported collateral market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Token {
    Bat,
    Comp,
    Dai,
    Eth,
    Rep,
    Sai,
    Uni,
    Usdc,
    Usdt,
    Wbtc,
    Zrx,
}

impl Token {
    /// All supported tokens, in canonical iteration order.
    ///
    /// Anything that folds over the token set must use this order so
    /// results are independent of map iteration quirks.
    pub const ALL: [Token; 11] = [
        Token::Bat,
        Token::Comp,
        Token::Dai,
        Token::Eth,
        Token::Rep,
        Token::Sai,
        Token::Uni,
        Token::Usdc,
        Token::Usdt,
        Token::Wbtc,
        Token::Zrx,
    ];

    /// Decimal precision of the underlying asset.
    pub fn underlying_decimals(&self) -> u32 {
        match self {
            Token::Usdc | Token::Usdt => 6,
            Token::Wbtc => 8,
            _ => 18,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Bat => "BAT",
            Token::Comp => "COMP",
            Token::Dai => "DAI",
            Token::Eth => "ETH",
            Token::Rep => "REP",
            Token::Sai => "SAI",
            Token::Uni => "UNI",
            Token::Usdc => "USDC",
            Token::Usdt => "USDT",
            Token::Wbtc => "WBTC",
            Token::Zrx => "ZRX",
        };
        write!(f, "{}", s)
    }
}
