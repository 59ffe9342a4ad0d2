//! Dev wallet endpoints: the in-memory value channel backing buy/sell.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub async fn fund(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ValueRequest>,
) -> axum::response::Response {
    match services.wallets.credit(caller.account(), body.value) {
        Ok(balance) => (StatusCode::OK, Json(json!({ "balance": balance.to_string() }))).into_response(),
        Err(e) => errors::json_error(StatusCode::UNPROCESSABLE_ENTITY, "wallet_error", e.to_string()),
    }
}

pub async fn wallet_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account): Path<String>,
) -> axum::response::Response {
    let account = match dto::parse_account("account", &account) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services.wallets.balance(account) {
        Ok(balance) => (StatusCode::OK, Json(json!({ "balance": balance.to_string() }))).into_response(),
        Err(e) => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "wallet_error", e.to_string()),
    }
}
