//! Frame transport abstraction for CAN-style telemetry.
//!
//! Provides a unified interface over the substrate that carries telemetry frames:
//! - UDP datagrams, unicast or IPv4 multicast ([`UdpTransport`])
//! - In-process channels for loopback and tests ([`ChannelTransport`])
//!
//! This is the lowest layer of cantel. Everything else builds on top of the
//! [`FrameSource`] / [`FrameSink`] traits and the [`RawFrame`] type provided here.

pub mod channel;
pub mod datagram;
pub mod error;
pub mod traits;
pub mod udp;

pub use channel::{ChannelSender, ChannelTransport};
pub use datagram::{decode_datagram, encode_datagram, ID_HEADER_SIZE, MAX_DATAGRAM_SIZE, MAX_PAYLOAD};
pub use error::{Result, TransportError};
pub use traits::{FrameSink, FrameSource, RawFrame};
pub use udp::{UdpConfig, UdpTransport, DEFAULT_MULTICAST_GROUP, DEFAULT_PORT};
