use axum::{
    Router,
    routing::{get, post},
};

pub mod system;
pub mod tokens;
pub mod trading;
pub mod wallets;

/// Read-only endpoints (no caller identity needed).
pub fn read_router() -> Router {
    Router::new()
        .route("/price", get(system::price))
        .route("/state", get(system::state))
        .route("/quote/buy", get(trading::quote_buy))
        .route("/quote/sell", get(trading::quote_sell))
        .route("/balances/:account", get(tokens::balance_of))
        .route("/allowances/:owner/:spender", get(tokens::allowance))
        .route("/wallets/:account", get(wallets::wallet_balance))
}

/// Endpoints acting on behalf of the `x-account-id` caller.
pub fn acting_router() -> Router {
    Router::new()
        .route("/buy", post(trading::buy))
        .route("/sell", post(trading::sell))
        .route("/receive", post(trading::receive))
        .route("/fallback", post(trading::fallback))
        .route("/transfer", post(tokens::transfer))
        .route("/approve", post(tokens::approve))
        .route("/transfer-from", post(tokens::transfer_from))
        .route("/allowances/increase", post(tokens::increase_allowance))
        .route("/allowances/decrease", post(tokens::decrease_allowance))
        .route("/wallets/fund", post(wallets::fund))
}
