use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use voxshockd::config::load_config;
use voxshockd::server::{default_socket_path, DaemonServer};
use voxshockd::state::DaemonState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    info!("voxshock daemon (voxshockd) starting...");

    let config = load_config();
    let state = Arc::new(Mutex::new(DaemonState::new(config)?));

    let server = DaemonServer::new(default_socket_path(), state);
    server.run().await?;

    Ok(())
}
