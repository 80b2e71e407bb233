//! Shortfall computation
//!
//! Pure functions over a candidate's balances, the per-shard price and
//! exchange-rate caches, and the static protocol parameters. The shortfall
//! is debt value minus collateral value in USD; a positive result means the
//! account is liquidatable.
//!
//! Price selection is conservative per token: if the account is a net
//! supplier of a token (supply balance > 0), the minimum observed price is
//! used for both the collateral and the debt leg of that token; otherwise
//! the maximum observed price is used for both. This biases every token's
//! valuation toward the extreme that understates account health.
//!
//! Missing data is not an error: if any token lacks a min price, a max
//! price, or (when the account supplies that token) an exchange rate, the
//! whole evaluation yields exactly zero. Callers cannot distinguish this
//! from a genuinely balanced account; the policy is conservative-by-silence
//! and means no decision is ever emitted from incomplete market data.
//!
//! All arithmetic is saturating. Raw balances are arbitrary base-unit
//! integers from the wire, so a value leg can exceed `Decimal`'s range;
//! clamping keeps the function total — an account whose debt saturates
//! still reads as liquidatable instead of killing the shard.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use types::candidate::Candidate;
use types::decision::LiquidationCandidate;
use types::params::ProtocolParams;
use types::token::Token;

/// Result of evaluating one candidate against the current caches.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Debt minus collateral in USD. Positive ⇒ liquidatable.
    pub shortfall: Decimal,
    /// Market with the largest debt leg, if any leg is positive.
    pub repay_token: Option<Token>,
    /// Market with the largest collateral leg, if any leg is positive.
    pub seize_token: Option<Token>,
}

impl Evaluation {
    /// Zero evaluation used when market data is incomplete.
    fn empty() -> Self {
        Self {
            shortfall: Decimal::ZERO,
            repay_token: None,
            seize_token: None,
        }
    }

    /// Build the instruction context for a liquidatable account.
    ///
    /// Returns `None` when there is no positive debt leg, which cannot
    /// happen for a strictly positive shortfall.
    pub fn liquidation_candidate(&self, candidate: &Candidate) -> Option<LiquidationCandidate> {
        let repay_token = self.repay_token?;
        // An account with debt but no collateral power still gets seized
        // against its repay market; the txmanager rejects what it cannot use.
        let seize_token = self.seize_token.unwrap_or(repay_token);
        Some(LiquidationCandidate {
            address: candidate.address.clone(),
            shortfall: self.shortfall,
            repay_token,
            seize_token,
        })
    }
}

/// Evaluate a candidate: shortfall plus repay/seize context in one pass.
///
/// Iterates the token set in canonical order, so the result is independent
/// of how the caches were populated.
pub fn evaluate(
    candidate: &Candidate,
    min_prices: &BTreeMap<Token, Decimal>,
    max_prices: &BTreeMap<Token, Decimal>,
    exchange_rates: &BTreeMap<Token, Decimal>,
    params: &ProtocolParams,
) -> Evaluation {
    let mut collateral = Decimal::ZERO;
    let mut debt = Decimal::ZERO;

    let mut repay_token: Option<(Token, Decimal)> = None;
    let mut seize_token: Option<(Token, Decimal)> = None;

    for token in Token::ALL {
        let (min_price, max_price) = match (min_prices.get(&token), max_prices.get(&token)) {
            (Some(min), Some(max)) => (*min, *max),
            // Incomplete price data: the whole account reads as healthy.
            _ => return Evaluation::empty(),
        };

        let supply = candidate.supply_of(token);
        let borrow = candidate.borrow_of(token);

        let price_usd = if supply > Decimal::ZERO {
            min_price
        } else {
            max_price
        };

        // The exchange rate only enters the collateral leg; a token the
        // account does not supply never needs one.
        let collateral_usd = if supply > Decimal::ZERO {
            let rate = match exchange_rates.get(&token) {
                Some(rate) => *rate,
                None => return Evaluation::empty(),
            };
            supply
                .saturating_mul(rate)
                .saturating_mul(price_usd)
                .saturating_mul(params.for_token(token).collateral_factor)
        } else {
            Decimal::ZERO
        };
        let debt_usd = borrow.saturating_mul(price_usd);

        collateral = collateral.saturating_add(collateral_usd);
        debt = debt.saturating_add(debt_usd);

        if debt_usd > Decimal::ZERO && repay_token.map_or(true, |(_, best)| debt_usd > best) {
            repay_token = Some((token, debt_usd));
        }
        if collateral_usd > Decimal::ZERO
            && seize_token.map_or(true, |(_, best)| collateral_usd > best)
        {
            seize_token = Some((token, collateral_usd));
        }
    }

    Evaluation {
        shortfall: debt.saturating_sub(collateral),
        repay_token: repay_token.map(|(token, _)| token),
        seize_token: seize_token.map(|(token, _)| token),
    }
}

/// Shortfall of a candidate. See [`evaluate`] for the full contract.
pub fn shortfall(
    candidate: &Candidate,
    min_prices: &BTreeMap<Token, Decimal>,
    max_prices: &BTreeMap<Token, Decimal>,
    exchange_rates: &BTreeMap<Token, Decimal>,
    params: &ProtocolParams,
) -> Decimal {
    evaluate(candidate, min_prices, max_prices, exchange_rates, params).shortfall
}
