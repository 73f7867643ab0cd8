//! Message endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, Query, State,
    },
    http::HeaderMap,
    Json,
};

use crate::api::state::AppState;
use crate::error::RelayError;
use crate::store::MessageQuery;
use crate::types::{Message, MessagePage, NewMessage};

/// GET /api/messages - Paginated listing, newest first
///
/// Query: `page`, `pageSize`, `channel`, `q`.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<Json<MessagePage>, RelayError> {
    let Query(query) = query.map_err(|e| RelayError::Malformed(e.body_text()))?;
    Ok(Json(state.store.query(&query)))
}

/// POST /api/messages - Post a message
///
/// Returns the stored message with its assigned id and timestamp. The
/// response does not wait for the durable flush. A body that cannot be
/// decoded still goes through the rate limit before it is rejected.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<NewMessage>, JsonRejection>,
) -> Result<Json<Message>, RelayError> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client_key = state.client_key(&headers, peer);

    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            state.store.check_rate(&client_key)?;
            return Err(RelayError::Malformed(rejection.body_text()));
        }
    };

    let message = state.store.post(&req, &client_key)?;
    Ok(Json(message))
}
