//! Connect to an MT9085 and print its `*IDN?` identification string.

use anritsu::{ConnectionArgs, ScpiClient};
use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Query the identification string of an Anritsu analyzer
#[derive(Parser, Debug)]
#[command(name = "mt9085_idn")]
#[command(version)]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,
}

fn run(args: Args) -> Result<()> {
    let config = args.connection.into_config()?;
    info!("Target instrument {}", config.address());
    let mut client = ScpiClient::new(config);

    let mut session = client.session();
    if !session.is_connected() {
        warn!("Instrument not reachable, nothing to query");
        return Ok(());
    }

    if let Ok(identification) = session.query("*IDN?") {
        if !identification.is_empty() {
            println!("*IDN? response: {identification}\n");
        }
    }

    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(Args::parse()) {
        error!("Unexpected error: {e:#}");
        std::process::exit(1);
    }
}
