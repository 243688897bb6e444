use anyhow::Context;

use stockflow_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockflow_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let service = stockflow_api::app::services::build_service(&config)
        .await
        .context("failed to initialise services")?;

    let app = stockflow_api::app::build_app(config.jwt_secret.as_bytes(), service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
