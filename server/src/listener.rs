//! Accept loop and per-transfer workers.
//!
//! The listener reads one datagram at a time and immediately returns
//! to accepting; every valid transfer request spawns an independent
//! worker task bound to a fresh ephemeral endpoint dedicated to that
//! one client. Workers share no state with the listener or with each
//! other — each owns its endpoint, window store and engine outright,
//! so no locking exists anywhere on this path.

use std::net::SocketAddr;

use log::{debug, error, info, warn};
use srtransport::core::{Packet, PacketKind};
use srtransport::session::SenderSession;
use srtransport::{Endpoint, Impairment, Result, TransferRequest, RETRY_TIMEOUT};
use tokio::fs::File;

pub async fn run(port: u16, error_rate: f64) -> Result<()> {
    let listener = Endpoint::bind(("0.0.0.0", port), Impairment::new(error_rate)).await?;
    info!("listening on {}", listener.local_addr()?);

    loop {
        let Some((datagram, from)) = listener.recv_timeout(RETRY_TIMEOUT).await? else {
            continue;
        };

        match Packet::decode(&datagram) {
            Ok(pkt) if pkt.header.kind == PacketKind::Filename => {
                match TransferRequest::decode(&pkt.payload) {
                    Ok(request) => {
                        info!("transfer request for {} from {from}", request.filename);
                        tokio::spawn(serve_transfer(request, from, error_rate));
                    }
                    // Protocol violation: reject locally, no session.
                    Err(e) => warn!("dropping malformed request from {from}: {e}"),
                }
            }
            Ok(pkt) => debug!("ignoring {:?} from {from}", pkt.header.kind),
            Err(e) => debug!("discarding unusable datagram from {from}: {e}"),
        }
    }
}

/// One worker per accepted transfer.
///
/// Checks that the requested file opens, answers the handshake from
/// the fresh endpoint (so the client re-targets its session at this
/// worker, not the listener), and runs the whole transfer.
async fn serve_transfer(request: TransferRequest, client: SocketAddr, error_rate: f64) {
    let endpoint = match Endpoint::ephemeral(Impairment::new(error_rate)).await {
        Ok(ep) => ep,
        Err(e) => {
            error!("cannot bind worker endpoint: {e}");
            return;
        }
    };

    let file = File::open(&request.filename).await;
    let ack = Packet::handshake_ack(file.is_ok());
    if let Err(e) = endpoint.send_to(&ack, client).await {
        error!("cannot answer {client}: {e}");
        return;
    }

    let source = match file {
        Ok(f) => f,
        Err(e) => {
            warn!("rejected {} for {client}: {e}", request.filename);
            return;
        }
    };
    if let Err(e) = endpoint.connect(client).await {
        error!("cannot dedicate endpoint to {client}: {e}");
        return;
    }

    info!("serving {} to {client}", request.filename);
    match SenderSession::new(endpoint, &request.config).run(source).await {
        Ok(()) => info!("finished {} for {client}", request.filename),
        Err(e) => warn!("abandoned {} for {client}: {e}", request.filename),
    }
}
