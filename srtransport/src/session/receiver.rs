//! Receive-side session driver: handshake establishment plus the
//! reception loop.

use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::{Packet, PacketKind};
use crate::engine::ReceiverEngine;
use crate::error::{Error, Result};
use crate::handshake::{self, TransferRequest};
use crate::transport::Endpoint;
use crate::{MAX_ATTEMPTS, RETRY_TIMEOUT};

/// Drives a [`ReceiverEngine`] over an [`Endpoint`] connected to the
/// sender's per-transfer data endpoint.
pub struct ReceiverSession {
    endpoint: Endpoint,
    engine: ReceiverEngine,
}

impl ReceiverSession {
    /// Negotiates a transfer with the server listening at `server`.
    ///
    /// Sends the Filename request and waits for the acknowledgment,
    /// retrying on a fixed one-second cadence up to the attempt bound.
    /// On `Ok` the endpoint is connected to the address the
    /// acknowledgment actually came from — the sender's fresh,
    /// connection-dedicated endpoint, not the listener. On `Not Ok`
    /// the session fails with [`Error::HandshakeRejected`].
    pub async fn establish(
        endpoint: Endpoint,
        server: SocketAddr,
        request: &TransferRequest,
    ) -> Result<Self> {
        let filename_pkt = request.to_packet();

        for attempt in 1..=MAX_ATTEMPTS {
            endpoint.send_to(&filename_pkt, server).await?;
            debug!("handshake attempt {attempt}/{MAX_ATTEMPTS} for {}", request.filename);

            let Some((datagram, from)) = endpoint.recv_timeout(RETRY_TIMEOUT).await? else {
                continue;
            };
            match Packet::decode(&datagram) {
                Ok(pkt) if pkt.header.kind == PacketKind::HandshakeAck => {
                    if !handshake::is_accepted(&pkt.payload) {
                        warn!("server rejected {}", request.filename);
                        return Err(Error::HandshakeRejected);
                    }
                    info!("transfer accepted, data endpoint {from}");
                    endpoint.connect(from).await?;
                    return Ok(Self {
                        endpoint,
                        engine: ReceiverEngine::new(&request.config),
                    });
                }
                Ok(pkt) => debug!("ignoring {:?} during handshake", pkt.header.kind),
                Err(e) => debug!("discarding unusable datagram during handshake: {e}"),
            }
        }

        Err(Error::RetriesExhausted)
    }

    /// Receives the whole file into `sink`.
    ///
    /// Every in-order byte is written (and flushed) as soon as it is
    /// deliverable, so an abandoned session leaves the successfully
    /// delivered prefix on disk. Returns once end-of-file has been
    /// delivered and acknowledged.
    pub async fn run<W>(mut self, mut sink: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            match self.endpoint.recv_timeout(RETRY_TIMEOUT).await? {
                None => self.engine.on_timeout()?,
                Some((datagram, _from)) => match Packet::decode(&datagram) {
                    Err(_) => {
                        let srej = self.engine.on_corrupt();
                        self.endpoint.send(&srej).await?;
                    }
                    Ok(pkt) => {
                        let delivery = self.engine.on_packet(&pkt)?;
                        if !delivery.bytes.is_empty() {
                            sink.write_all(&delivery.bytes).await?;
                            sink.flush().await?;
                        }
                        if let Some(reply) = delivery.reply {
                            self.endpoint.send(&reply).await?;
                        }
                        if delivery.complete {
                            info!("file received through seq={}", self.engine.expected());
                            return Ok(());
                        }
                    }
                },
            }
        }
    }
}
