use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::datagram::{decode_datagram, encode_datagram, MAX_DATAGRAM_SIZE};
use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource, RawFrame};

/// Default multicast group shared by telemetry senders and analyzers.
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 0, 0, 1);

/// Default UDP port.
pub const DEFAULT_PORT: u16 = 43113;

/// Shortest read timeout applied to the socket; zero would mean "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Configuration for [`UdpTransport`].
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind.
    pub bind: SocketAddr,
    /// Multicast group to join after binding. `None` for plain unicast.
    pub multicast_group: Option<Ipv4Addr>,
    /// Interface used for the multicast membership.
    pub interface: Ipv4Addr,
    /// Where `send` delivers datagrams.
    pub destination: SocketAddr,
    /// How long `receive` blocks before reporting "no data".
    pub read_timeout: Duration,
    /// Multicast TTL for outgoing datagrams.
    pub multicast_ttl: u32,
    /// Whether outgoing multicast datagrams loop back to local listeners.
    pub multicast_loop: bool,
    /// Minimum spacing between attempts to reopen a failed socket.
    pub reopen_interval: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            multicast_group: Some(DEFAULT_MULTICAST_GROUP),
            interface: Ipv4Addr::UNSPECIFIED,
            destination: SocketAddr::V4(SocketAddrV4::new(DEFAULT_MULTICAST_GROUP, DEFAULT_PORT)),
            read_timeout: Duration::from_millis(200),
            multicast_ttl: 1,
            multicast_loop: true,
            reopen_interval: Duration::from_secs(1),
        }
    }
}

impl UdpConfig {
    /// Receive-side configuration on a unicast address, no group membership.
    pub fn unicast(bind: SocketAddr) -> Self {
        Self {
            bind,
            multicast_group: None,
            ..Self::default()
        }
    }

    /// Send-side configuration: ephemeral local port, datagrams go to `destination`.
    pub fn sender(destination: SocketAddr) -> Self {
        Self {
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            multicast_group: None,
            destination,
            ..Self::default()
        }
    }
}

/// UDP datagram transport, unicast or IPv4 multicast.
///
/// Each datagram carries exactly one frame (see [`crate::datagram`]). When the
/// socket fails, it is dropped and reopened on a later call, no more often than
/// `reopen_interval`. [`UdpTransport::close`] is final.
pub struct UdpTransport {
    config: UdpConfig,
    socket: Option<UdpSocket>,
    last_open_attempt: Instant,
    closed: bool,
    send_buf: BytesMut,
}

impl UdpTransport {
    /// Bind the socket (and join the group, if configured).
    ///
    /// Failing here is reported to the caller directly; only later failures go
    /// through the reopen policy.
    pub fn open(config: UdpConfig) -> Result<Self> {
        let socket = open_socket(&config)?;
        Ok(Self {
            config,
            socket: Some(socket),
            last_open_attempt: Instant::now(),
            closed: false,
            send_buf: BytesMut::with_capacity(MAX_DATAGRAM_SIZE),
        })
    }

    /// Local address of the live socket, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Current configuration.
    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Whether a socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Close the transport permanently. Later calls fail with [`TransportError::Closed`].
    pub fn close(&mut self) {
        if !self.closed {
            debug!(bind = %self.config.bind, "closing udp transport");
        }
        self.closed = true;
        self.socket = None;
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        if self.config.multicast_group.is_some() {
            "udp-multicast"
        } else {
            "udp"
        }
    }

    fn ensure_socket(&mut self) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.socket.is_none() {
            let since = self.last_open_attempt.elapsed();
            if since < self.config.reopen_interval {
                // Pace the caller instead of letting it spin on the outage.
                let wait = (self.config.reopen_interval - since).min(self.config.read_timeout);
                std::thread::sleep(wait);
                return Err(TransportError::Disconnected(
                    "socket unavailable, waiting to reopen".to_string(),
                ));
            }
            self.last_open_attempt = Instant::now();
            let socket = open_socket(&self.config)?;
            info!(bind = %self.config.bind, "udp socket reopened");
            self.socket = Some(socket);
        }
        Ok(())
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| TransportError::Disconnected("socket unavailable".to_string()))
    }

    fn drop_socket(&mut self, err: &std::io::Error) {
        warn!(bind = %self.config.bind, error = %err, "udp socket failed, will reopen");
        self.socket = None;
        self.last_open_attempt = Instant::now();
    }
}

impl FrameSource for UdpTransport {
    fn receive(&mut self) -> Result<Option<RawFrame>> {
        // One spare byte so an oversized datagram shows up as a too-long payload.
        let mut buf = [0u8; MAX_DATAGRAM_SIZE + 1];
        self.ensure_socket()?;
        let received = self.socket()?.recv_from(&mut buf);
        match received {
            Ok((n, from)) => {
                let frame = decode_datagram(&buf[..n], Instant::now());
                debug!(%from, id = frame.id, len = frame.payload.len(), "datagram received");
                Ok(Some(frame))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => {
                self.drop_socket(&err);
                Err(TransportError::Io(err))
            }
        }
    }
}

impl FrameSink for UdpTransport {
    fn send(&mut self, id: u16, payload: &[u8]) -> Result<()> {
        self.send_buf.clear();
        encode_datagram(id, payload, &mut self.send_buf)?;
        self.ensure_socket()?;
        let sent = self.socket()?.send_to(&self.send_buf, self.config.destination);
        match sent {
            Ok(_) => Ok(()),
            Err(err) => {
                self.drop_socket(&err);
                Err(TransportError::Io(err))
            }
        }
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("type", &self.transport_name())
            .field("bind", &self.config.bind)
            .field("connected", &self.socket.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

fn open_socket(config: &UdpConfig) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(config.bind).map_err(|source| TransportError::Bind {
        addr: config.bind,
        source,
    })?;

    if let Some(group) = config.multicast_group {
        socket
            .join_multicast_v4(&group, &config.interface)
            .map_err(|source| TransportError::Join {
                group,
                interface: config.interface,
                source,
            })?;
        info!(%group, interface = %config.interface, "joined multicast group");
    }

    if config.destination.ip().is_multicast() {
        socket.set_multicast_loop_v4(config.multicast_loop)?;
        socket.set_multicast_ttl_v4(config.multicast_ttl)?;
    }

    socket.set_read_timeout(Some(config.read_timeout.max(MIN_READ_TIMEOUT)))?;

    info!(bind = %config.bind, "udp socket bound");
    Ok(socket)
}
