//! Shard state and processing loop
//!
//! A shard owns one partition of the address space: the candidate cache,
//! its own copy of the min/max price and exchange-rate caches, and the
//! edge-detector memory mapping each address to its last computed
//! shortfall. Nothing here is shared — every field is touched only by the
//! shard's own task, so no locking is needed anywhere in this module.
//!
//! Price and rate updates only refresh the caches; an account is
//! re-evaluated on its next candidate update, not when market data moves.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use types::candidate::{Address, Candidate};
use types::decision::Decision;
use types::params::ProtocolParams;
use types::price::{PriceUpdate, RateUpdate};
use types::token::Token;

use crate::events::WorkerEvent;
use crate::shortfall;

/// Fatal shard-local failures. Any of these terminates the shard task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardError {
    #[error("shard {shard}: delegation channel closed while emitting a decision")]
    DelegationClosed { shard: usize },
}

/// One partition of the liquidation-monitoring state.
pub struct Shard {
    id: usize,
    params: Arc<ProtocolParams>,
    /// Latest balance snapshot per owned address.
    candidates: HashMap<Address, Candidate>,
    /// Latest minimum observed USD price per token.
    min_prices: BTreeMap<Token, Decimal>,
    /// Latest maximum observed USD price per token.
    max_prices: BTreeMap<Token, Decimal>,
    /// Latest protocol-unit ↔ underlying exchange rate per token.
    exchange_rates: BTreeMap<Token, Decimal>,
    /// Edge-detector memory: last computed shortfall per address.
    liquidatability: HashMap<Address, Decimal>,
    /// Sender side of the delegation channel.
    decision_tx: mpsc::Sender<Decision>,
    decisions_emitted: u64,
}

impl Shard {
    pub fn new(id: usize, params: Arc<ProtocolParams>, decision_tx: mpsc::Sender<Decision>) -> Self {
        Self {
            id,
            params,
            candidates: HashMap::new(),
            min_prices: BTreeMap::new(),
            max_prices: BTreeMap::new(),
            exchange_rates: BTreeMap::new(),
            liquidatability: HashMap::new(),
            decision_tx,
            decisions_emitted: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of addresses this shard currently tracks.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Decisions emitted since the shard started.
    pub fn decisions_emitted(&self) -> u64 {
        self.decisions_emitted
    }

    /// Overwrite the cached balances for an account and re-evaluate it.
    ///
    /// The caller guarantees the address partitions to this shard. A
    /// decision is emitted only on a sign transition of the shortfall:
    /// non-positive → positive emits a liquidate, positive → non-positive
    /// emits a cancel, anything else just refreshes the stored value.
    pub async fn on_candidate_update(&mut self, candidate: Candidate) -> Result<(), ShardError> {
        let address = candidate.address.clone();

        let evaluation = shortfall::evaluate(
            &candidate,
            &self.min_prices,
            &self.max_prices,
            &self.exchange_rates,
            &self.params,
        );

        // Absent entry ⇒ the account was never liquidatable.
        let previous = self
            .liquidatability
            .get(&address)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let was_liquidatable = previous > Decimal::ZERO;
        let is_liquidatable = evaluation.shortfall > Decimal::ZERO;

        debug!(
            shard = self.id,
            address = %address,
            shortfall = %evaluation.shortfall,
            "candidate evaluated"
        );

        if !was_liquidatable && is_liquidatable {
            match evaluation.liquidation_candidate(&candidate) {
                Some(instruction) => {
                    info!(
                        shard = self.id,
                        address = %address,
                        shortfall = %instruction.shortfall,
                        repay = %instruction.repay_token,
                        seize = %instruction.seize_token,
                        "rising edge, submitting liquidation candidate"
                    );
                    self.emit(Decision::Liquidate(instruction)).await?;
                }
                // Positive shortfall with no debt leg cannot happen; if the
                // arithmetic is ever broken, say so loudly instead of
                // submitting a bogus instruction.
                None => warn!(
                    shard = self.id,
                    address = %address,
                    "liquidatable account with no repay leg, decision suppressed"
                ),
            }
        } else if was_liquidatable && !is_liquidatable {
            info!(
                shard = self.id,
                address = %address,
                "falling edge, cancelling liquidation candidate"
            );
            self.emit(Decision::Cancel {
                address: address.clone(),
            })
            .await?;
        }

        self.liquidatability.insert(address.clone(), evaluation.shortfall);
        self.candidates.insert(address, candidate);
        Ok(())
    }

    /// Overwrite the price cache entries named in the update.
    ///
    /// Does not re-evaluate any account; accounts pick up the new prices on
    /// their next candidate update.
    pub fn on_price_update(&mut self, update: &PriceUpdate) {
        for entry in &update.min_prices {
            self.min_prices.insert(entry.token, entry.price_usd);
        }
        for entry in &update.max_prices {
            self.max_prices.insert(entry.token, entry.price_usd);
        }
        for (token, rate) in &update.exchange_rates {
            self.exchange_rates.insert(*token, *rate);
        }
        debug!(
            shard = self.id,
            min = update.min_prices.len(),
            max = update.max_prices.len(),
            rates = update.exchange_rates.len(),
            "price caches updated"
        );
    }

    /// Overwrite the exchange-rate cache entries named in the update.
    pub fn on_rate_update(&mut self, update: &RateUpdate) {
        for (token, rate) in &update.exchange_rates {
            self.exchange_rates.insert(*token, *rate);
        }
        debug!(
            shard = self.id,
            rates = update.exchange_rates.len(),
            "exchange-rate cache updated"
        );
    }

    async fn emit(&mut self, decision: Decision) -> Result<(), ShardError> {
        self.decision_tx
            .send(decision)
            .await
            .map_err(|_| ShardError::DelegationClosed { shard: self.id })?;
        self.decisions_emitted += 1;
        Ok(())
    }
}

/// Shard task loop: drain the inbound channel until it closes.
///
/// Channel closure is the shutdown signal and exits cleanly. A
/// [`ShardError`] means the process is no longer trustworthy from this
/// shard's perspective; the loop logs and terminates rather than continue.
pub async fn run_shard(mut shard: Shard, mut events: mpsc::Receiver<WorkerEvent>) {
    let id = shard.id();
    info!(shard = id, "shard started");

    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Candidate(candidate) => {
                if let Err(err) = shard.on_candidate_update(candidate).await {
                    error!(shard = id, error = %err, "fatal shard error, terminating");
                    return;
                }
            }
            WorkerEvent::Prices(update) => shard.on_price_update(&update),
            WorkerEvent::Rates(update) => shard.on_rate_update(&update),
        }
    }

    info!(
        shard = id,
        candidates = shard.candidate_count(),
        decisions = shard.decisions_emitted(),
        "shard channel closed, exiting"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::decision::Decision;
    use types::price::TokenPrice;

    fn flat_price_update(price: Decimal) -> PriceUpdate {
        let mut update = PriceUpdate::default();
        for token in Token::ALL {
            update.min_prices.push(TokenPrice::new(token, price));
            update.max_prices.push(TokenPrice::new(token, price));
            update.exchange_rates.insert(token, Decimal::ONE);
        }
        update
    }

    fn eth_candidate(address: &str, supply: u64, borrow: u64) -> Candidate {
        let mut candidate = Candidate::new(Address::new(address));
        candidate
            .set_supply(Token::Eth, Decimal::from(supply))
            .set_borrow(Token::Eth, Decimal::from(borrow));
        candidate
    }

    fn shard_with_channel(capacity: usize) -> (Shard, mpsc::Receiver<Decision>) {
        let (tx, rx) = mpsc::channel(capacity);
        let shard = Shard::new(0, Arc::new(ProtocolParams::mainnet()), tx);
        (shard, rx)
    }

    #[tokio::test]
    async fn test_edge_triggering_sequence() {
        let (mut shard, mut rx) = shard_with_channel(16);
        shard.on_price_update(&flat_price_update(Decimal::ONE));

        // Fixed supply of 20 ETH (cf 0.75 ⇒ collateral 15); borrows chosen
        // to walk the shortfall through [-5, -1, +3, +3, -2, +1].
        let borrows = [10u64, 14, 18, 18, 13, 16];
        for borrow in borrows {
            shard
                .on_candidate_update(eth_candidate("0x01", 20, borrow))
                .await
                .unwrap();
        }

        let mut emitted = Vec::new();
        while let Ok(decision) = rx.try_recv() {
            emitted.push(decision);
        }

        // Only sign transitions emit; repeats do not.
        assert_eq!(emitted.len(), 3);
        assert!(matches!(emitted[0], Decision::Liquidate(_)));
        assert!(matches!(emitted[1], Decision::Cancel { .. }));
        assert!(matches!(emitted[2], Decision::Liquidate(_)));
        assert_eq!(shard.decisions_emitted(), 3);
    }

    #[tokio::test]
    async fn test_no_decision_without_prices() {
        let (mut shard, mut rx) = shard_with_channel(16);

        // Deep in debt, but no price data at all.
        shard
            .on_candidate_update(eth_candidate("0x01", 0, 1_000_000))
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_price_update_alone_never_emits() {
        let (mut shard, mut rx) = shard_with_channel(16);
        shard.on_price_update(&flat_price_update(Decimal::ONE));

        // Supply ETH, borrow DAI: 14 debt vs 20*0.75 = 15 collateral → -1.
        let mut candidate = Candidate::new(Address::new("0x01"));
        candidate
            .set_supply(Token::Eth, Decimal::from(20))
            .set_borrow(Token::Dai, Decimal::from(14));
        shard.on_candidate_update(candidate.clone()).await.unwrap();
        assert!(rx.try_recv().is_err());

        // Only the debt asset moves: DAI doubles, ETH stays. The account
        // is now underwater (28 - 15 = +13), but a price update by itself
        // only refreshes the caches.
        let mut spike = PriceUpdate::default();
        spike
            .min_prices
            .push(TokenPrice::new(Token::Dai, Decimal::from(2)));
        spike
            .max_prices
            .push(TokenPrice::new(Token::Dai, Decimal::from(2)));
        shard.on_price_update(&spike);

        assert!(rx.try_recv().is_err());

        // Next candidate update picks up the new price and fires.
        shard.on_candidate_update(candidate).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), Decision::Liquidate(_)));
    }

    #[tokio::test]
    async fn test_rate_update_overwrites_cache_lazily() {
        let (mut shard, mut rx) = shard_with_channel(16);
        shard.on_price_update(&flat_price_update(Decimal::ONE));

        // Halving the exchange rate halves collateral: 14 - 20*0.5*0.75 > 0.
        let mut rates = RateUpdate::default();
        rates
            .exchange_rates
            .insert(Token::Eth, Decimal::from_str_exact("0.5").unwrap());
        shard.on_rate_update(&rates);
        assert!(rx.try_recv().is_err());

        shard
            .on_candidate_update(eth_candidate("0x01", 20, 14))
            .await
            .unwrap();
        assert!(matches!(rx.try_recv().unwrap(), Decision::Liquidate(_)));
    }

    #[tokio::test]
    async fn test_liquidate_carries_context() {
        let (mut shard, mut rx) = shard_with_channel(16);
        shard.on_price_update(&flat_price_update(Decimal::ONE));

        shard
            .on_candidate_update(eth_candidate("0x01", 100, 200))
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            Decision::Liquidate(instruction) => {
                assert_eq!(instruction.address, Address::new("0x01"));
                assert_eq!(instruction.shortfall, Decimal::from(125));
                assert_eq!(instruction.repay_token, Token::Eth);
                assert_eq!(instruction.seize_token, Token::Eth);
            }
            other => panic!("expected liquidate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_delegation_channel_is_fatal() {
        let (mut shard, rx) = shard_with_channel(1);
        drop(rx);
        shard.on_price_update(&flat_price_update(Decimal::ONE));

        let result = shard.on_candidate_update(eth_candidate("0x01", 0, 100)).await;
        assert_eq!(result, Err(ShardError::DelegationClosed { shard: 0 }));
    }

    #[tokio::test]
    async fn test_run_shard_exits_on_channel_close() {
        let (decision_tx, _decision_rx) = mpsc::channel(16);
        let shard = Shard::new(3, Arc::new(ProtocolParams::mainnet()), decision_tx);
        let (event_tx, event_rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_shard(shard, event_rx));
        drop(event_tx);
        handle.await.unwrap();
    }
}
