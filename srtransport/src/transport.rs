//! UDP endpoint abstraction with an optional network-impairment layer.
//!
//! [`Endpoint`] is a thin wrapper around `tokio::net::UdpSocket` that
//! speaks [`Packet`] on send and raw datagrams on receive (the caller
//! decodes, because a checksum failure must be visible to the engines
//! as "corrupt arrival" rather than silently dropped here).
//!
//! The [`Impairment`] fault model applies to **outgoing** datagrams
//! only: with a configured probability a datagram is dropped, has one
//! bit flipped, is delivered twice, or is held back until a later
//! datagram overtakes it. Rate `0.0` is a transparent pass-through.
//! The RNG is seedable so lossy tests are reproducible.
//! The protocol must stay correct under any combination of these
//! faults; they exist to exercise it, not to be survived by luck.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::time;

use crate::core::Packet;
use crate::error::Result;
use crate::MAX_PDU_SIZE;

/// What the fault model decided for one outgoing datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Deliver,
    Drop,
    Flip { byte: usize, bit: u8 },
    Duplicate,
    Reorder,
}

/// Configurable error-rate fault model for outgoing datagrams.
#[derive(Debug)]
pub struct Impairment {
    error_rate: f64,
    rng: Mutex<StdRng>,
}

impl Impairment {
    /// Creates a fault model injecting faults at `error_rate`
    /// (0.0 ..= 1.0) with OS-seeded randomness.
    pub fn new(error_rate: f64) -> Self {
        Self {
            error_rate,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates a fault model with a fixed seed, for reproducible tests.
    pub fn seeded(error_rate: f64, seed: u64) -> Self {
        Self {
            error_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// A transparent pass-through (rate 0.0).
    pub fn off() -> Self {
        Self::new(0.0)
    }

    fn plan(&self, len: usize) -> Fault {
        if self.error_rate <= 0.0 {
            return Fault::Deliver;
        }

        let mut rng = self.rng.lock().unwrap();
        if rng.random::<f64>() >= self.error_rate {
            return Fault::Deliver;
        }
        match rng.random_range(0..4u8) {
            0 => Fault::Drop,
            1 => Fault::Flip {
                byte: rng.random_range(0..len),
                bit: rng.random_range(0..8u8),
            },
            2 => Fault::Duplicate,
            _ => Fault::Reorder,
        }
    }
}

/// An async, packet-sending UDP endpoint with impairment on send.
///
/// All methods are `&self`; each transfer session owns exactly one
/// endpoint and never shares it with another session.
#[derive(Debug)]
pub struct Endpoint {
    socket: UdpSocket,
    impair: Impairment,

    /// Datagram held back by a reorder fault, released after the next
    /// transmission overtakes it.
    held: Mutex<Option<(Vec<u8>, Option<SocketAddr>)>>,
}

impl Endpoint {
    /// Binds an endpoint to `addr`.
    ///
    /// Passing port 0 lets the OS choose an ephemeral port.
    pub async fn bind(addr: impl ToSocketAddrs, impair: Impairment) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            impair,
            held: Mutex::new(None),
        })
    }

    /// Binds a fresh endpoint on an OS-assigned port, the
    /// one-endpoint-per-transfer pattern.
    pub async fn ephemeral(impair: Impairment) -> Result<Self> {
        Self::bind("0.0.0.0:0", impair).await
    }

    /// Local address after binding.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Restricts the endpoint to one peer; datagrams from anyone else
    /// are filtered by the OS from here on.
    pub async fn connect(&self, peer: SocketAddr) -> Result<()> {
        self.socket.connect(peer).await?;
        Ok(())
    }

    /// Encodes `packet` and sends it to `dest`, subject to impairment.
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<()> {
        let datagram = packet.encode()?;
        self.transmit(&datagram, Some(dest)).await
    }

    /// Encodes `packet` and sends it to the connected peer, subject to
    /// impairment.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        let datagram = packet.encode()?;
        self.transmit(&datagram, None).await
    }

    /// Waits up to `wait` for one datagram.
    ///
    /// Returns `Ok(None)` on timeout. The raw bytes are returned
    /// undecoded together with their source address.
    pub async fn recv_timeout(&self, wait: Duration) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buf = vec![0u8; MAX_PDU_SIZE + 1];
        match time::timeout(wait, self.socket.recv_from(&mut buf)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok((n, addr))) => {
                buf.truncate(n);
                trace!("recv {} bytes from {}", n, addr);
                Ok(Some((buf, addr)))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn transmit(&self, datagram: &[u8], dest: Option<SocketAddr>) -> Result<()> {
        match self.impair.plan(datagram.len()) {
            Fault::Deliver => self.raw_send(datagram, dest).await?,
            Fault::Drop => {
                debug!("impairment: dropped {} byte datagram", datagram.len());
            }
            Fault::Flip { byte, bit } => {
                debug!("impairment: flipped bit {bit} of byte {byte}");
                let mut corrupt = datagram.to_vec();
                corrupt[byte] ^= 1 << bit;
                self.raw_send(&corrupt, dest).await?;
            }
            Fault::Duplicate => {
                debug!("impairment: duplicated {} byte datagram", datagram.len());
                self.raw_send(datagram, dest).await?;
                self.raw_send(datagram, dest).await?;
            }
            Fault::Reorder => {
                debug!("impairment: holding {} byte datagram back", datagram.len());
                *self.held.lock().unwrap() = Some((datagram.to_vec(), dest));
                return Ok(());
            }
        }

        // A datagram held back earlier has now been overtaken; let it go.
        let overtaken = self.held.lock().unwrap().take();
        if let Some((late, late_dest)) = overtaken {
            debug!("impairment: releasing reordered datagram");
            self.raw_send(&late, late_dest).await?;
        }
        Ok(())
    }

    async fn raw_send(&self, datagram: &[u8], dest: Option<SocketAddr>) -> Result<()> {
        match dest {
            Some(dest) => self.socket.send_to(datagram, dest).await?,
            None => self.socket.send(datagram).await?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PacketKind;

    #[test]
    fn test_impairment_off_always_delivers() {
        let impair = Impairment::off();
        for _ in 0..100 {
            assert_eq!(impair.plan(64), Fault::Deliver);
        }
    }

    #[test]
    fn test_impairment_full_rate_never_delivers() {
        let impair = Impairment::seeded(1.0, 7);
        for _ in 0..100 {
            assert_ne!(impair.plan(64), Fault::Deliver);
        }
    }

    #[test]
    fn test_impairment_seed_is_reproducible() {
        let a = Impairment::seeded(0.5, 42);
        let b = Impairment::seeded(0.5, 42);
        for _ in 0..100 {
            assert_eq!(a.plan(64), b.plan(64));
        }
    }

    #[tokio::test]
    async fn test_loopback_roundtrip() {
        let rx = Endpoint::bind("127.0.0.1:0", Impairment::off()).await.unwrap();
        let tx = Endpoint::bind("127.0.0.1:0", Impairment::off()).await.unwrap();

        let pkt = Packet::data(9, b"payload".to_vec());
        tx.send_to(&pkt, rx.local_addr().unwrap()).await.unwrap();

        let (buf, from) = rx
            .recv_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .expect("datagram expected");
        assert_eq!(from, tx.local_addr().unwrap());

        let decoded = Packet::decode(&buf).unwrap();
        assert_eq!(decoded.header.kind, PacketKind::Data);
        assert_eq!(decoded.payload, b"payload");
    }

    #[tokio::test]
    async fn test_recv_timeout_expires() {
        let ep = Endpoint::bind("127.0.0.1:0", Impairment::off()).await.unwrap();
        let got = ep.recv_timeout(Duration::from_millis(50)).await.unwrap();
        assert!(got.is_none());
    }
}
