//! Static protocol parameter table
//!
//! Collateral factors, underlying decimals, and protocol-wide constants.
//! Built once at startup, never mutated afterwards, and shared across all
//! shards without synchronization because it is immutable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::token::Token;

/// Protocol generation tag for a token market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    V1,
    V2,
    Eth,
}

/// Static per-token protocol data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenParams {
    /// Fraction of supplied value that counts as collateral.
    pub collateral_factor: Decimal,
    /// Decimal precision of the underlying asset.
    pub underlying_decimals: u32,
    /// Market generation tag.
    pub kind: TokenKind,
}

/// The full protocol parameter table.
///
/// Covers every variant of [`Token`], so lookups are total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParams {
    tokens: BTreeMap<Token, TokenParams>,
    /// Fraction of a borrow that may be repaid in one liquidation.
    pub close_factor: Decimal,
    /// Multiplier applied to seized collateral as liquidator incentive.
    pub liquidation_incentive: Decimal,
}

impl ProtocolParams {
    /// Build a table from explicit per-token entries.
    ///
    /// # Panics
    /// Panics if any supported token is missing from `tokens`; the table
    /// must be total so shard-side lookups never fail.
    pub fn new(
        tokens: BTreeMap<Token, TokenParams>,
        close_factor: Decimal,
        liquidation_incentive: Decimal,
    ) -> Self {
        for token in Token::ALL {
            assert!(
                tokens.contains_key(&token),
                "ProtocolParams missing entry for {}",
                token
            );
        }
        Self {
            tokens,
            close_factor,
            liquidation_incentive,
        }
    }

    /// The mainnet parameter table.
    pub fn mainnet() -> Self {
        let mut tokens = BTreeMap::new();
        for token in Token::ALL {
            let kind = match token {
                Token::Eth => TokenKind::Eth,
                Token::Sai | Token::Rep => TokenKind::V1,
                _ => TokenKind::V2,
            };
            // SAI is deprecated and carries no collateral power.
            let collateral_factor = match token {
                Token::Sai => Decimal::ZERO,
                Token::Eth | Token::Dai | Token::Usdc => Decimal::from_str_exact("0.75").unwrap(),
                Token::Wbtc | Token::Uni | Token::Comp => Decimal::from_str_exact("0.65").unwrap(),
                Token::Usdt => Decimal::ZERO,
                _ => Decimal::from_str_exact("0.60").unwrap(),
            };
            tokens.insert(
                token,
                TokenParams {
                    collateral_factor,
                    underlying_decimals: token.underlying_decimals(),
                    kind,
                },
            );
        }

        Self {
            tokens,
            close_factor: Decimal::from_str_exact("0.5").unwrap(),
            liquidation_incentive: Decimal::from_str_exact("1.08").unwrap(),
        }
    }

    /// Look up the parameters for a token. Total over the enum.
    pub fn for_token(&self, token: Token) -> &TokenParams {
        &self.tokens[&token]
    }
}
