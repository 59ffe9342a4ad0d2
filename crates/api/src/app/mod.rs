//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger service, dev wallets and the event feed
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use curvebook_ledger::LedgerId;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(ledger_id: LedgerId) -> Router {
    let services = Arc::new(services::build_services(ledger_id));

    // Mutating routes: require a caller identity.
    let acting = routes::acting_router()
        .layer(axum::middleware::from_fn(middleware::caller_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::read_router())
        .merge(acting)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
