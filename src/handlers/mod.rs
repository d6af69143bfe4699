pub mod content;
pub mod coupons;
pub mod stores;

use crate::db::UpdateError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Map an admin-update failure to its JSON envelope. Internal detail stays
/// in the server log; the client sees a minimal message.
pub(crate) fn update_error_response(e: UpdateError, what: &str) -> Response {
    match e {
        UpdateError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": format!("{what} not found") })),
        )
            .into_response(),
        UpdateError::Duplicate(msg) | UpdateError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": msg })),
        )
            .into_response(),
        UpdateError::Db(e) => {
            tracing::error!("failed to update {}: {:?}", what, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("Failed to update {what}") })),
            )
                .into_response()
        }
    }
}
