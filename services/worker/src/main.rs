use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use types::candidate::Address;
use types::decision::LiquidationCandidate;
use types::params::ProtocolParams;
use worker::config::WorkerConfig;
use worker::delegator::{run_delegator, ChannelTxManagerClient};
use worker::dispatcher::Dispatcher;
use worker::server::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = WorkerConfig::from_env()?;
    info!(
        shards = config.shard_count,
        txmanager = %config.txmanager_addr,
        "starting liquidation worker"
    );

    // Static protocol parameters: built once, shared immutably everywhere.
    let params = Arc::new(ProtocolParams::mainnet());

    // Delegation channel: all shards feed one consumer.
    let (decision_tx, decision_rx) = mpsc::channel(config.channel_capacity);

    // Outbound streams toward the transaction manager. The receiver halves
    // are where the txmanager transport plugs in; replies are log-only, so
    // the stand-in consumers just record what was forwarded.
    let (liquidate_tx, mut liquidate_rx) =
        mpsc::channel::<LiquidationCandidate>(config.channel_capacity);
    let (cancel_tx, mut cancel_rx) = mpsc::channel::<Address>(config.channel_capacity);
    tokio::spawn(async move {
        while let Some(candidate) = liquidate_rx.recv().await {
            info!(address = %candidate.address, "liquidate instruction handed to transport");
        }
        info!("liquidate stream completed");
    });
    tokio::spawn(async move {
        while let Some(address) = cancel_rx.recv().await {
            info!(%address, "cancel instruction handed to transport");
        }
        info!("cancel stream completed");
    });

    let client = ChannelTxManagerClient::new(liquidate_tx, cancel_tx);
    let delegator = tokio::spawn(run_delegator(client, decision_rx));

    // Worker pool.
    let dispatcher = Dispatcher::spawn(
        config.shard_count,
        config.channel_capacity,
        params,
        decision_tx,
    );

    // Inbound boundary.
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };
    let app = create_router(state.clone());
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // Tear down back-to-front: closing the shard channels drains the
    // shards, which drops the last delegation senders, which lets the
    // delegation loop close both outbound streams.
    match Arc::try_unwrap(state.dispatcher) {
        Ok(dispatcher) => {
            dispatcher.shutdown().await;
            let _ = delegator.await?;
        }
        Err(_) => {
            tracing::warn!("lingering connections hold the dispatcher, aborting delegation loop");
            delegator.abort();
        }
    }

    info!("worker stopped");
    Ok(())
}
