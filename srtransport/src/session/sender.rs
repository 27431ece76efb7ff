//! Send-side session driver: one worker, one endpoint, one file.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::SessionConfig;
use crate::core::{Packet, PacketKind};
use crate::engine::SenderEngine;
use crate::error::Result;
use crate::transport::Endpoint;
use crate::RETRY_TIMEOUT;

/// Drives a [`SenderEngine`] over a connection-dedicated [`Endpoint`].
///
/// The endpoint must already be connected to the client that the
/// handshake accepted. The session owns both exclusively; concurrent
/// transfers each run their own `SenderSession` in their own task and
/// share nothing.
pub struct SenderSession {
    endpoint: Endpoint,
    engine: SenderEngine,
    buffer_size: usize,
}

impl SenderSession {
    /// Creates a session for a freshly accepted transfer.
    pub fn new(endpoint: Endpoint, config: &SessionConfig) -> Self {
        Self {
            endpoint,
            engine: SenderEngine::new(config),
            buffer_size: config.buffer_size as usize,
        }
    }

    /// Transfers the whole of `source` to the peer.
    ///
    /// Returns once the peer has acknowledged end-of-file, or with an
    /// error when the consecutive-timeout bound is exceeded.
    pub async fn run<R>(mut self, mut source: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        // Initial burst: pipeline a full window before waiting for
        // any acknowledgment.
        self.fill(&mut source).await?;

        loop {
            match self.endpoint.recv_timeout(RETRY_TIMEOUT).await? {
                None => {
                    for pkt in self.engine.on_timeout()? {
                        self.endpoint.send(&pkt).await?;
                    }
                }
                Some((datagram, _from)) => match Packet::decode(&datagram) {
                    Err(e) => debug!("discarding unusable datagram: {e}"),
                    Ok(pkt) => match pkt.header.kind {
                        PacketKind::Rr => {
                            if self.engine.on_rr(pkt.header.sequence) > 0 {
                                self.fill(&mut source).await?;
                            }
                        }
                        PacketKind::Srej => {
                            if let Some(replay) = self.engine.on_srej(pkt.header.sequence) {
                                self.endpoint.send(&replay).await?;
                            }
                        }
                        PacketKind::Eof => {
                            self.engine.on_eof_ack();
                            info!("transfer complete, base={}", self.engine.base());
                            return Ok(());
                        }
                        other => debug!("ignoring {other:?} packet"),
                    },
                },
            }
        }
    }

    /// Queues and transmits new packets until the window is full or
    /// the file is exhausted (which queues the Eof marker instead).
    async fn fill<R>(&mut self, source: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        while self.engine.can_queue() {
            let chunk = read_chunk(source, self.buffer_size).await?;
            let pkt = if chunk.is_empty() {
                self.engine.queue_eof()?
            } else {
                self.engine.queue_chunk(&chunk)?
            };
            self.endpoint.send(&pkt).await?;
        }
        Ok(())
    }
}

/// Reads up to `size` bytes, retrying short reads; an empty result
/// means end of file.
async fn read_chunk<R>(source: &mut R, size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; size];
    let mut filled = 0;
    while filled < size {
        let n = source.read(&mut chunk[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    chunk.truncate(filled);
    Ok(chunk)
}
