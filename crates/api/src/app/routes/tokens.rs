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

fn accepted(result: Result<bool, curvebook_infra::DispatchError>) -> axum::response::Response {
    match result {
        Ok(ok) => (StatusCode::OK, Json(json!({ "ok": ok }))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn balance_of(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account): Path<String>,
) -> axum::response::Response {
    let account = match dto::parse_account("account", &account) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services.ledger.balance_of(account) {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({ "account": account.to_string(), "balance": balance.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn allowance(
    Extension(services): Extension<Arc<AppServices>>,
    Path((owner, spender)): Path<(String, String)>,
) -> axum::response::Response {
    let (owner, spender) = match (
        dto::parse_account("owner", &owner),
        dto::parse_account("spender", &spender),
    ) {
        (Ok(o), Ok(s)) => (o, s),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    match services.ledger.allowance(owner, spender) {
        Ok(value) => (StatusCode::OK, Json(json!({ "allowance": value.to_string() }))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let to = match dto::parse_account("to", &body.to) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    accepted(services.ledger.transfer(caller.account(), to, body.value))
}

pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::ApproveRequest>,
) -> axum::response::Response {
    let spender = match dto::parse_account("spender", &body.spender) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    accepted(services.ledger.approve(caller.account(), spender, body.value))
}

pub async fn transfer_from(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::TransferFromRequest>,
) -> axum::response::Response {
    let (from, to) = match (
        dto::parse_account("from", &body.from),
        dto::parse_account("to", &body.to),
    ) {
        (Ok(f), Ok(t)) => (f, t),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    accepted(services.ledger.transfer_from(caller.account(), from, to, body.value))
}

pub async fn increase_allowance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::AllowanceDeltaRequest>,
) -> axum::response::Response {
    let spender = match dto::parse_account("spender", &body.spender) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    accepted(services.ledger.increase_allowance(caller.account(), spender, body.delta))
}

pub async fn decrease_allowance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::AllowanceDeltaRequest>,
) -> axum::response::Response {
    let spender = match dto::parse_account("spender", &body.spender) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    accepted(services.ledger.decrease_allowance(caller.account(), spender, body.delta))
}
