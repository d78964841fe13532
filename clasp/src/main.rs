use std::net::SocketAddr;

use args::Args;
use clap::Parser;
use tokio_util::sync::CancellationToken;

mod args;
mod logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(&args);

    let config = config::Config::from_env()?;
    let listen_address = SocketAddr::from(([0, 0, 0, 0], config.port));

    let shutdown_signal = CancellationToken::new();
    let shutdown_signal_task = shutdown_signal.clone();
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            log::error!("failed to install ctrl-c handler: {error}");
            return;
        }
        shutdown_signal_task.cancel();
    });

    server::serve(server::ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
    .await
}
