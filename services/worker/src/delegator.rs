//! Delegation channel to the transaction manager
//!
//! A single serialized pipeline: every shard sends its decisions into one
//! queue, and exactly one consumer task forwards them, in arrival order,
//! over two persistent outbound streams — one for liquidate instructions,
//! one for cancels. The streams are opened together before the first send
//! and closed together at shutdown; replies from the txmanager are only
//! ever observed for logging and never gate further sends.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info};

use types::candidate::Address;
use types::decision::{Decision, LiquidationCandidate};

/// Failures in the outbound stream lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelegatorError {
    #[error("txmanager streams used before open()")]
    NotOpen,

    #[error("failed to establish txmanager streams: {reason}")]
    OpenFailed { reason: String },

    #[error("liquidate stream rejected send")]
    LiquidateStreamClosed,

    #[error("cancel stream rejected send")]
    CancelStreamClosed,
}

/// Stream lifecycle contract with the downstream transaction manager.
///
/// `open` must precede any send and establishes both persistent streams;
/// `close` signals end-of-stream on both; `shutdown` releases the
/// underlying connection. The component never operates with only one
/// stream open.
#[async_trait]
pub trait TxManagerClient: Send {
    async fn open(&mut self) -> Result<(), DelegatorError>;
    async fn submit(&mut self, candidate: LiquidationCandidate) -> Result<(), DelegatorError>;
    async fn cancel(&mut self, address: Address) -> Result<(), DelegatorError>;
    async fn close(&mut self);
    async fn shutdown(&mut self);
}

/// Delegation consumer loop.
///
/// Opens the outbound streams, then forwards decisions in dequeue order.
/// Exits when the decision channel closes (orderly shutdown) or when a
/// send fails; in both cases the streams are closed and the connection is
/// released before returning. Decisions already handed to the transport
/// are never re-queued.
pub async fn run_delegator<C: TxManagerClient>(
    mut client: C,
    mut decisions: mpsc::Receiver<Decision>,
) -> Result<(), DelegatorError> {
    if let Err(err) = client.open().await {
        error!(error = %err, "could not open txmanager streams");
        client.shutdown().await;
        return Err(err);
    }
    info!("txmanager streams open, delegation loop running");

    while let Some(decision) = decisions.recv().await {
        let result = match decision {
            Decision::Liquidate(candidate) => {
                info!(
                    address = %candidate.address,
                    shortfall = %candidate.shortfall,
                    "forwarding liquidate instruction"
                );
                client.submit(candidate).await
            }
            Decision::Cancel { address } => {
                info!(address = %address, "forwarding cancel instruction");
                client.cancel(address).await
            }
        };

        if let Err(err) = result {
            error!(error = %err, "txmanager send failed, closing streams");
            client.close().await;
            client.shutdown().await;
            return Err(err);
        }
    }

    info!("decision channel closed, closing txmanager streams");
    client.close().await;
    client.shutdown().await;
    Ok(())
}

/// In-process [`TxManagerClient`] over two mpsc senders.
///
/// Used by tests and by local wiring where the transport to the real
/// txmanager service is plugged in behind the receiver halves.
pub struct ChannelTxManagerClient {
    /// Senders held between construction and `open()`.
    pending: Option<Streams>,
    /// Live streams between `open()` and `close()`. Dropping them is the
    /// end-of-stream signal on both channels at once.
    streams: Option<Streams>,
    submitted: u64,
    cancelled: u64,
}

struct Streams {
    liquidate: mpsc::Sender<LiquidationCandidate>,
    cancel: mpsc::Sender<Address>,
}

impl ChannelTxManagerClient {
    pub fn new(
        liquidate_tx: mpsc::Sender<LiquidationCandidate>,
        cancel_tx: mpsc::Sender<Address>,
    ) -> Self {
        Self {
            pending: Some(Streams {
                liquidate: liquidate_tx,
                cancel: cancel_tx,
            }),
            streams: None,
            submitted: 0,
            cancelled: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.streams.is_some()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

#[async_trait]
impl TxManagerClient for ChannelTxManagerClient {
    async fn open(&mut self) -> Result<(), DelegatorError> {
        match self.pending.take() {
            Some(streams) => {
                self.streams = Some(streams);
                info!("txmanager channel streams established");
                Ok(())
            }
            None => Err(DelegatorError::OpenFailed {
                reason: "streams already opened once".to_string(),
            }),
        }
    }

    async fn submit(&mut self, candidate: LiquidationCandidate) -> Result<(), DelegatorError> {
        let streams = self.streams.as_ref().ok_or(DelegatorError::NotOpen)?;
        streams
            .liquidate
            .send(candidate)
            .await
            .map_err(|_| DelegatorError::LiquidateStreamClosed)?;
        self.submitted += 1;
        Ok(())
    }

    async fn cancel(&mut self, address: Address) -> Result<(), DelegatorError> {
        let streams = self.streams.as_ref().ok_or(DelegatorError::NotOpen)?;
        streams
            .cancel
            .send(address)
            .await
            .map_err(|_| DelegatorError::CancelStreamClosed)?;
        self.cancelled += 1;
        Ok(())
    }

    async fn close(&mut self) {
        // Dropping the stream senders is the end-of-stream signal; both
        // streams terminate together.
        self.streams = None;
        info!(
            submitted = self.submitted,
            cancelled = self.cancelled,
            "txmanager streams closed"
        );
    }

    async fn shutdown(&mut self) {
        self.pending = None;
        self.streams = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::token::Token;

    fn liquidation(address: &str) -> LiquidationCandidate {
        LiquidationCandidate {
            address: Address::new(address),
            shortfall: Decimal::from(125),
            repay_token: Token::Dai,
            seize_token: Token::Eth,
        }
    }

    fn client_with_streams() -> (
        ChannelTxManagerClient,
        mpsc::Receiver<LiquidationCandidate>,
        mpsc::Receiver<Address>,
    ) {
        let (liquidate_tx, liquidate_rx) = mpsc::channel(16);
        let (cancel_tx, cancel_rx) = mpsc::channel(16);
        (
            ChannelTxManagerClient::new(liquidate_tx, cancel_tx),
            liquidate_rx,
            cancel_rx,
        )
    }

    #[tokio::test]
    async fn test_send_before_open_is_rejected() {
        let (mut client, _liq, _can) = client_with_streams();
        assert_eq!(
            client.submit(liquidation("0x01")).await,
            Err(DelegatorError::NotOpen)
        );
        assert_eq!(
            client.cancel(Address::new("0x01")).await,
            Err(DelegatorError::NotOpen)
        );
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let (mut client, _liq, _can) = client_with_streams();
        client.open().await.unwrap();
        client.submit(liquidation("0x01")).await.unwrap();
        client.close().await;

        assert_eq!(
            client.submit(liquidation("0x02")).await,
            Err(DelegatorError::NotOpen)
        );
    }

    #[tokio::test]
    async fn test_delegator_forwards_in_arrival_order() {
        let (client, mut liquidate_rx, mut cancel_rx) = client_with_streams();
        let (decision_tx, decision_rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_delegator(client, decision_rx));

        decision_tx
            .send(Decision::Liquidate(liquidation("0x01")))
            .await
            .unwrap();
        decision_tx
            .send(Decision::Cancel {
                address: Address::new("0x02"),
            })
            .await
            .unwrap();
        decision_tx
            .send(Decision::Liquidate(liquidation("0x03")))
            .await
            .unwrap();

        assert_eq!(
            liquidate_rx.recv().await.unwrap().address,
            Address::new("0x01")
        );
        assert_eq!(cancel_rx.recv().await.unwrap(), Address::new("0x02"));
        assert_eq!(
            liquidate_rx.recv().await.unwrap().address,
            Address::new("0x03")
        );

        // Orderly shutdown: dropping the producer side ends the loop and
        // closes both streams.
        drop(decision_tx);
        assert_eq!(handle.await.unwrap(), Ok(()));
        assert!(liquidate_rx.recv().await.is_none());
        assert!(cancel_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_delegator_closes_on_send_failure() {
        let (client, liquidate_rx, _cancel_rx) = client_with_streams();
        // Downstream liquidate stream is already gone.
        drop(liquidate_rx);

        let (decision_tx, decision_rx) = mpsc::channel(16);
        let handle = tokio::spawn(run_delegator(client, decision_rx));

        decision_tx
            .send(Decision::Liquidate(liquidation("0x01")))
            .await
            .unwrap();

        assert_eq!(
            handle.await.unwrap(),
            Err(DelegatorError::LiquidateStreamClosed)
        );
    }
}
