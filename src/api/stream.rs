//! SSE (Server-Sent Events) stream of newly accepted messages
//!
//! `GET /api/stream?channel=...` pushes every message accepted after the
//! client connects. Clients fetch history from `/api/messages` first, then
//! subscribe.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use log::error;
use serde::Deserialize;
use tokio::sync::broadcast;

use super::state::AppState;

/// Query parameters for the stream
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// Only forward messages from this channel
    pub channel: Option<String>,
}

/// GET /api/stream - Live message stream
pub async fn stream_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let mut rx = state.store.subscribe();
    let channel = params
        .channel
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if channel.as_deref().is_some_and(|c| c != message.channel) {
                        continue;
                    }
                    let data = match serde_json::to_string(&message) {
                        Ok(data) => data,
                        Err(e) => {
                            error!("Failed to encode message {} for the stream: {}", message.id, e);
                            continue;
                        }
                    };
                    yield Ok::<_, Infallible>(Event::default()
                        .event("message")
                        .id(message.id.to_string())
                        .data(data));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Client is too slow
                    let error = serde_json::json!({
                        "code": "lagged",
                        "message": format!("Missed {} messages, please reload", n),
                    });
                    yield Ok(Event::default().event("error").data(error.to_string()));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(30)))
}
