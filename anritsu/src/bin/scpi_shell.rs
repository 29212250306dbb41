//! Interactive SCPI console.
//!
//! Lines ending in `?` are sent as queries and the response is printed. Any
//! other line is sent as a command. `exit`, Ctrl-C or Ctrl-D leave the shell.

use anritsu::{ConnectionArgs, ScpiClient, DEFAULT_BUFFER_SIZE};
use anyhow::{bail, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Interactive SCPI console for Anritsu analyzers
#[derive(Parser, Debug)]
#[command(name = "scpi_shell")]
#[command(version)]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Read size for query responses
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut client = ScpiClient::new(args.connection.into_config()?);

    let mut session = client.session();
    if let Some(e) = session.connect_error() {
        bail!("{e}");
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("scpi> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }
        let _ = rl.add_history_entry(line);

        // Failures are already logged by the client; keep the shell alive.
        if line.ends_with('?') {
            if let Ok(response) = session.query_with_buffer(line, args.buffer_size) {
                println!("{response}");
            }
        } else {
            let _ = session.send_command(line);
        }
    }

    info!("Leaving shell");
    Ok(())
}
