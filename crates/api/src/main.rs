use anyhow::Context;

use curvebook_infra::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    curvebook_observability::init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let app = curvebook_api::app::build_app(config.ledger_id);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        ledger_id = %config.ledger_id,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
