use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// GenAI gateway recording OpenTelemetry GenAI telemetry for every call.
#[derive(Debug, Parser)]
#[command(name = "lantern", version, about)]
pub struct Args {
    /// Path to the TOML configuration file. Defaults apply when it does not exist.
    #[arg(short, long, env = "LANTERN_CONFIG", default_value = "lantern.toml")]
    pub config: PathBuf,

    /// Address to listen on, overriding `server.listen_address`.
    #[arg(short, long, env = "LANTERN_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Log filter, e.g. "info" or "server=debug,telemetry=debug".
    #[arg(long, env = "LANTERN_LOG", default_value = "info")]
    pub log: String,
}
