//! Amounts cross the wire as decimal strings: `u128` values routinely exceed
//! what JSON numbers carry without loss.

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use curvebook_core::AccountId;
use curvebook_ledger::{BuyQuote, LedgerSnapshot, SellQuote};

use crate::app::errors;

/// `#[serde(with = "amount")]` for `u128` fields carried as decimal strings.
pub mod amount {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim()
            .parse::<u128>()
            .map_err(|e| de::Error::custom(format!("invalid amount '{raw}': {e}")))
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    #[serde(with = "amount")]
    pub value: u128,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    #[serde(with = "amount")]
    pub amount: u128,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to: String,
    #[serde(with = "amount")]
    pub value: u128,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub spender: String,
    #[serde(with = "amount")]
    pub value: u128,
}

#[derive(Debug, Deserialize)]
pub struct TransferFromRequest {
    pub from: String,
    pub to: String,
    #[serde(with = "amount")]
    pub value: u128,
}

#[derive(Debug, Deserialize)]
pub struct AllowanceDeltaRequest {
    pub spender: String,
    #[serde(with = "amount")]
    pub delta: u128,
}

#[derive(Debug, Deserialize)]
pub struct FallbackRequest {
    #[serde(with = "amount")]
    pub value: u128,
    /// Opaque payload; accepted and ignored.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteBuyParams {
    #[serde(with = "amount")]
    pub value: u128,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSellParams {
    #[serde(with = "amount")]
    pub amount: u128,
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn parse_account(field: &'static str, raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.trim().parse::<AccountId>().map_err(|e| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_account_id",
            format!("{field}: {e}"),
        )
    })
}

pub fn snapshot_to_json(snapshot: &LedgerSnapshot) -> Value {
    json!({
        "ledger_id": snapshot.ledger_id.to_string(),
        "version": snapshot.version,
        "total_supply": snapshot.total_supply.to_string(),
        "net_traded": snapshot.net_traded.to_string(),
        "reserve": snapshot.reserve.to_string(),
        "current_price": snapshot.current_price.to_string(),
        "holders": snapshot.holders,
    })
}

pub fn buy_quote_to_json(quote: BuyQuote) -> Value {
    json!({
        "minted": quote.minted.to_string(),
        "price": quote.price.to_string(),
    })
}

pub fn sell_quote_to_json(quote: SellQuote) -> Value {
    json!({
        "payout": quote.payout.to_string(),
        "price": quote.price.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_parse_beyond_u64() {
        let body: ValueRequest =
            serde_json::from_str(r#"{"value":"340282366920938463463374607431768211455"}"#).unwrap();
        assert_eq!(body.value, u128::MAX);
    }

    #[test]
    fn numeric_or_garbage_amounts_are_rejected() {
        assert!(serde_json::from_str::<ValueRequest>(r#"{"value":"12abc"}"#).is_err());
        assert!(serde_json::from_str::<ValueRequest>(r#"{"value":"-1"}"#).is_err());
        assert!(serde_json::from_str::<ValueRequest>(r#"{"value":12}"#).is_err());
    }
}
