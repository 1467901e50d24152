use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Bounded per-read timeout. Poll loops re-check cancellation and
/// deadlines at least this often.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest datagram accepted. CSI records top out well below this on
/// current firmware.
const MAX_DATAGRAM: usize = 2048;

/// A UDP endpoint with a bounded read timeout.
///
/// Receiving endpoints are bound to a concrete port on all interfaces;
/// sending endpoints take an ephemeral port. Reads never block longer
/// than [`POLL_TIMEOUT`].
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
}

impl UdpEndpoint {
    /// Bind a receiving endpoint on `port` (all interfaces).
    pub fn bind(port: u16) -> Result<Self> {
        Self::bind_with(port, false)
    }

    /// Bind a broadcast-capable receiving endpoint on `port`.
    pub fn bind_broadcast(port: u16) -> Result<Self> {
        Self::bind_with(port, true)
    }

    fn bind_with(port: u16, broadcast: bool) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let bind_err = |source| TransportError::Bind { addr, source };

        let socket = UdpSocket::bind(addr).map_err(bind_err)?;
        if broadcast {
            socket.set_broadcast(true).map_err(bind_err)?;
        }
        socket.set_read_timeout(Some(POLL_TIMEOUT)).map_err(bind_err)?;

        info!(%addr, broadcast, "udp endpoint bound");
        Ok(Self { socket })
    }

    /// Create a sending endpoint on an ephemeral port.
    pub fn sender() -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        Ok(Self { socket })
    }

    /// Send one text datagram to `target`.
    pub fn send_text(&self, text: &str, target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(text.as_bytes(), target)
            .map_err(|source| TransportError::Send { target, source })?;
        debug!(%target, len = text.len(), "datagram sent");
        Ok(())
    }

    /// Receive the next datagram as trimmed UTF-8 text.
    ///
    /// Returns `Ok(None)` when the bounded read timed out; callers loop
    /// and re-check their cancellation flag. Invalid UTF-8 is replaced
    /// rather than rejected, matching the tolerant decode of the node's
    /// text protocol.
    pub fn recv_text(&self) -> Result<Option<(String, SocketAddr)>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                let text = String::from_utf8_lossy(&buf[..len]).trim().to_string();
                Ok(Some((text, from)))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(source) => Err(TransportError::Recv(source)),
        }
    }

    /// Local address the endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// Best-effort detection of the host's outbound IPv4 address.
///
/// Connecting a UDP socket makes the kernel pick the egress interface
/// without sending any datagram. Falls back to loopback when the host
/// has no route.
pub fn local_ip() -> Ipv4Addr {
    fn probe() -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1))?;
        Ok(socket.local_addr()?.ip())
    }

    match probe() {
        Ok(IpAddr::V4(ip)) => ip,
        _ => Ipv4Addr::LOCALHOST,
    }
}
