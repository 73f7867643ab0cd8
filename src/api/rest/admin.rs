//! Admin endpoints, guarded by the shared secret

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::warn;

use super::board::AnnouncementBody;
use super::ApiError;
use crate::api::state::AppState;

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if !state.admin_enabled() {
        let error = ApiError::forbidden("Admin access is disabled");
        return Err((StatusCode::FORBIDDEN, Json(error)).into_response());
    }
    if !state.is_admin(headers) {
        warn!("Rejected admin request with a missing or wrong secret");
        let error = ApiError::forbidden("Invalid admin secret");
        return Err((StatusCode::FORBIDDEN, Json(error)).into_response());
    }
    Ok(())
}

/// DELETE /api/admin/messages/:index - Delete the message at a buffer position
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &headers) {
        return rejection;
    }

    match state.store.delete(index) {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /api/admin/announcement - Replace the announcement
pub async fn put_announcement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AnnouncementBody>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &headers) {
        return rejection;
    }

    state.store.set_announcement(body.announcement.trim());
    let current = AnnouncementBody {
        announcement: state.store.announcement(),
    };
    (StatusCode::OK, Json(current)).into_response()
}
