use anyhow::Context;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

use aurus_odom::bus::Bus;
use aurus_odom::config::OdomConfig;
use aurus_odom::OdomNode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Aurus Odom starting.");

    let config = OdomConfig::load().context("loading configuration")?;
    let bus = Bus::new(config.bus.capacity).context("creating message bus")?;
    let node = OdomNode::spawn(&config, &bus).context("starting odometry node")?;

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Shutdown requested.");
    node.shutdown();
    node.join().await?;

    info!("Aurus Odom finished.");
    Ok(())
}
