//! Fetch driver: resolve the server, negotiate the session, receive
//! the file.

use std::io;

use log::info;
use srtransport::session::ReceiverSession;
use srtransport::{Endpoint, Error, Impairment, Result, SessionConfig, TransferRequest};
use tokio::fs::File;
use tokio::net::lookup_host;

use crate::Cli;

pub async fn run(cli: &Cli) -> Result<()> {
    let config = SessionConfig::new(cli.window_size, cli.buffer_size)?;
    let request = TransferRequest::new(cli.from_filename.as_str(), config)?;

    let server = lookup_host((cli.remote_host.as_str(), cli.remote_port))
        .await?
        .next()
        .ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot resolve {}", cli.remote_host),
            ))
        })?;
    info!("requesting {} from {server}", cli.from_filename);

    let endpoint = Endpoint::ephemeral(Impairment::new(cli.error_rate)).await?;
    let session = ReceiverSession::establish(endpoint, server, &request).await?;

    // A partially received file stays on disk if the session aborts.
    let sink = File::create(&cli.to_filename).await?;
    session.run(sink).await?;

    info!("wrote {}", cli.to_filename);
    Ok(())
}
