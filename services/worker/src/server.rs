//! Inbound service boundary
//!
//! Thin glue over WebSocket streams: each endpoint decodes JSON frames
//! into the corresponding update type and hands it to the dispatcher.
//! Malformed frames are logged and skipped — a bad message from the
//! delegator never reaches a shard. Stream-level errors abandon that
//! stream only; the rest of the process keeps running.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use types::candidate::CandidateBatch;
use types::price::{PriceUpdate, RateUpdate};

use crate::dispatcher::Dispatcher;

/// Shared handle to the shard pool.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the inbound router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/candidates", get(candidates_handler))
        .route("/v1/prices", get(prices_handler))
        .route("/v1/rates", get(rates_handler))
        .with_state(state)
}

/// Acknowledgement frame sent when an inbound stream completes.
const ACK_FRAME: &str = r#"{"ack":true}"#;

/// Decode one text frame; `None` means skip it.
fn decode_frame<T: DeserializeOwned>(endpoint: &str, text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(endpoint, error = %err, "skipping malformed frame");
            None
        }
    }
}

async fn candidates_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| candidates_stream(socket, state))
}

async fn prices_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| prices_stream(socket, state))
}

async fn rates_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| rates_stream(socket, state))
}

async fn candidates_stream(mut socket: WebSocket, state: AppState) {
    info!("candidate stream connected");
    while let Some(Ok(message)) = socket.next().await {
        match message {
            Message::Text(text) => {
                let Some(batch) = decode_frame::<CandidateBatch>("candidates", &text) else {
                    continue;
                };
                if let Err(err) = state.dispatcher.route_candidates(batch).await {
                    warn!(error = %err, "abandoning candidate stream");
                    return;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    info!("candidate stream ended");
}

async fn prices_stream(mut socket: WebSocket, state: AppState) {
    info!("price stream connected");
    while let Some(Ok(message)) = socket.next().await {
        match message {
            Message::Text(text) => {
                let Some(update) = decode_frame::<PriceUpdate>("prices", &text) else {
                    continue;
                };
                if let Err(err) = state.dispatcher.broadcast_prices(update).await {
                    warn!(error = %err, "abandoning price stream");
                    return;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    // Acknowledge once the inbound stream ends.
    let _ = socket.send(Message::Text(ACK_FRAME.to_string())).await;
    info!("price stream ended");
}

async fn rates_stream(mut socket: WebSocket, state: AppState) {
    info!("rate stream connected");
    while let Some(Ok(message)) = socket.next().await {
        match message {
            Message::Text(text) => {
                let Some(update) = decode_frame::<RateUpdate>("rates", &text) else {
                    continue;
                };
                if let Err(err) = state.dispatcher.broadcast_rates(update).await {
                    warn!(error = %err, "abandoning rate stream");
                    return;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    let _ = socket.send(Message::Text(ACK_FRAME.to_string())).await;
    info!("rate stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::token::Token;

    #[test]
    fn test_decode_valid_batch() {
        let json = r#"{"candidates":[{"address":"0x01","borrow_balances":{"DAI":"100"}}]}"#;
        let batch: CandidateBatch = decode_frame("candidates", json).unwrap();
        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(
            batch.candidates[0].borrow_of(Token::Dai),
            Decimal::from(100)
        );
    }

    #[test]
    fn test_decode_malformed_frame_is_skipped() {
        assert!(decode_frame::<CandidateBatch>("candidates", "not json").is_none());
        assert!(decode_frame::<PriceUpdate>("prices", r#"{"min_prices":3}"#).is_none());
    }

    #[test]
    fn test_decode_rate_update() {
        let json = r#"{"exchange_rates":{"ETH":"1.0","USDC":"0.02"}}"#;
        let update: RateUpdate = decode_frame("rates", json).unwrap();
        assert_eq!(update.exchange_rates.len(), 2);
        assert_eq!(
            update.exchange_rates[&Token::Eth],
            Decimal::from_str_exact("1.0").unwrap()
        );
    }
}
