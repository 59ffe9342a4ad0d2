use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use curvebook_core::AccountId;

use crate::app::errors::json_error;
use crate::context::CallerContext;

pub const CALLER_HEADER: &str = "x-account-id";

pub async fn caller_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let account = extract_caller(req.headers())?;
    req.extensions_mut().insert(CallerContext::new(account));
    Ok(next.run(req).await)
}

fn extract_caller(headers: &HeaderMap) -> Result<AccountId, Response> {
    let missing = || {
        json_error(
            StatusCode::UNAUTHORIZED,
            "missing_caller",
            format!("{CALLER_HEADER} header is required"),
        )
    };

    let raw = headers
        .get(CALLER_HEADER)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| missing())?
        .trim();

    let account = raw.parse::<AccountId>().map_err(|e| {
        json_error(StatusCode::BAD_REQUEST, "invalid_account_id", e.to_string())
    })?;
    if account.is_null() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_account_id",
            "the null identity cannot act as a caller",
        ));
    }
    Ok(account)
}
