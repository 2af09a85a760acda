use anyhow::Context;
use roomrelay::{ConfigBuilder, RelayServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new()
        .from_env()
        .build()
        .context("invalid relay configuration")?;

    roomrelay::init_tracing_with_config(&config);
    tracing::info!(
        addr = %format!("{}:{}", config.server.host, config.server.port),
        store = %config.persistence.store_path.display(),
        "Starting roomrelay"
    );

    RelayServer::from_config(config)
        .context("failed to assemble relay server")?
        .serve()
        .await
        .context("relay server stopped with an error")?;

    Ok(())
}
