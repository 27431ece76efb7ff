//! Entry point for the transfer client.
//!
//! Parses CLI arguments and dispatches into the fetch driver; `main.rs`
//! owns only process setup (logging, argument validation, exit status).

use clap::Parser;
use log::error;

mod fetch;

/// Fetch a file from a remote server over the selective-repeat UDP
/// transfer protocol.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// File to fetch, as named on the server.
    from_filename: String,

    /// Local path to write the received file to.
    to_filename: String,

    /// Number of packets allowed in flight at once.
    window_size: u32,

    /// Payload bytes per data packet.
    buffer_size: u32,

    /// Probability of impairing each outgoing datagram (0.0 - 1.0).
    error_rate: f64,

    /// Server hostname or address.
    remote_host: String,

    /// Server UDP port.
    remote_port: u16,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.error_rate) {
        error!("error rate must be between 0.0 and 1.0");
        std::process::exit(1);
    }

    if let Err(e) = fetch::run(&cli).await {
        error!("transfer failed: {e}");
        std::process::exit(1);
    }
}
