use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn price(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.current_price() {
        Ok(price) => (
            StatusCode::OK,
            Json(serde_json::json!({ "price": price.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn state(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.snapshot() {
        Ok(snapshot) => (StatusCode::OK, Json(dto::snapshot_to_json(&snapshot))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
