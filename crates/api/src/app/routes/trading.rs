use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub async fn buy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ValueRequest>,
) -> axum::response::Response {
    match services.ledger.buy(caller.account(), body.value) {
        Ok(minted) => (StatusCode::OK, Json(json!({ "minted": minted.to_string() }))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn sell(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::SellRequest>,
) -> axum::response::Response {
    match services.ledger.sell(caller.account(), body.amount) {
        Ok(payout) => (StatusCode::OK, Json(json!({ "payout": payout.to_string() }))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ValueRequest>,
) -> axum::response::Response {
    match services.ledger.receive(caller.account(), body.value) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn fallback(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::FallbackRequest>,
) -> axum::response::Response {
    let data = body.data.map(String::into_bytes).unwrap_or_default();
    match services.ledger.fallback(caller.account(), body.value, data) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn quote_buy(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::QuoteBuyParams>,
) -> axum::response::Response {
    match services.ledger.quote_buy(params.value) {
        Ok(quote) => (StatusCode::OK, Json(dto::buy_quote_to_json(quote))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn quote_sell(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::QuoteSellParams>,
) -> axum::response::Response {
    match services.ledger.quote_sell(params.amount) {
        Ok(quote) => (StatusCode::OK, Json(dto::sell_quote_to_json(quote))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
