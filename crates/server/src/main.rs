use anyhow::Context;
use server::{Server, config::ServerConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env().context("loading configuration")?;
    Server::new(config).run().await
}
