//! Board-level read endpoints: channels, announcement, stats

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::types::{ChannelSummary, StoreStats};

/// Announcement body, shared by GET and the admin PUT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementBody {
    pub announcement: String,
}

/// GET /api/channels - Channels in the buffer with message counts
pub async fn list_channels(State(state): State<Arc<AppState>>) -> Json<Vec<ChannelSummary>> {
    Json(state.store.channels())
}

/// GET /api/announcement - Current announcement
pub async fn get_announcement(State(state): State<Arc<AppState>>) -> Json<AnnouncementBody> {
    Json(AnnouncementBody {
        announcement: state.store.announcement(),
    })
}

/// GET /api/stats - Store and durable log counters
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StoreStats> {
    Json(state.store.stats())
}
