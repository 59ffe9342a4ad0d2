use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use curvebook_core::LedgerError;
use curvebook_infra::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    let status = match &err {
        DispatchError::Rejected(e) => ledger_error_status(e),
        DispatchError::DepositFailed { .. } => StatusCode::PAYMENT_REQUIRED,
        DispatchError::PayoutFailed { .. } => StatusCode::BAD_GATEWAY,
        DispatchError::Reentrancy { .. } => StatusCode::CONFLICT,
        DispatchError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.code(), err.to_string())
}

fn ledger_error_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::ZeroDeposit
        | LedgerError::ZeroAmount
        | LedgerError::DepositTooSmall
        | LedgerError::TransferToNullIdentity => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientBalance { .. }
        | LedgerError::AllowanceExceeded { .. }
        | LedgerError::ReserveExhausted { .. } => StatusCode::CONFLICT,
        LedgerError::InvalidPrice | LedgerError::ArithmeticOverflow | LedgerError::InvalidCurve(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
