//! Entry point for the transfer server.

use clap::Parser;
use log::error;

mod listener;

/// Serve files to clients over the selective-repeat UDP transfer
/// protocol.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Probability of impairing each outgoing datagram (0.0 - 1.0).
    error_rate: f64,

    /// UDP port to listen on (0 lets the OS choose).
    #[arg(default_value_t = 0)]
    port: u16,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.error_rate) {
        error!("error rate must be between 0.0 and 1.0");
        std::process::exit(1);
    }

    if let Err(e) = listener::run(cli.port, cli.error_rate).await {
        error!("server failed: {e}");
        std::process::exit(1);
    }
}
