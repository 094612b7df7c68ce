// quired: document service entry point.

use anyhow::Context;
use quire_server::config::ServerConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::load().context("failed to load server configuration")?;
    info!(listen_addr = %config.listen_addr, "starting quired");

    quire_server::app::run(config).await.context("quired terminated unexpectedly")
}
