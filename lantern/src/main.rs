use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
};

use anyhow::Context;
use args::Args;
use clap::Parser;
use config::Config;
use server::ServeConfig;
use tokio_util::sync::CancellationToken;

mod args;

const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        Config::load(&args.config).with_context(|| format!("Failed to load {}", args.config.display()))?
    } else {
        Config::from_str("").context("Failed to build the default configuration")?
    };

    let listen_address = args
        .listen_address
        .or(config.server.listen_address)
        .unwrap_or(DEFAULT_LISTEN_ADDRESS);

    let shutdown_signal = CancellationToken::new();

    tokio::spawn({
        let shutdown_signal = shutdown_signal.clone();

        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {e}");
                return;
            }

            log::info!("Received Ctrl-C, shutting down");
            shutdown_signal.cancel();
        }
    });

    server::serve(ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter: args.log,
    })
    .await?;

    Ok(())
}
