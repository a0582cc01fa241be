use std::net::{Ipv4Addr, SocketAddr};

/// Errors that can occur in frame transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to join the multicast group.
    #[error("failed to join multicast group {group} on {interface}: {source}")]
    Join {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end went away; the adapter may recover on a later call.
    #[error("transport disconnected: {0}")]
    Disconnected(String),

    /// The payload does not fit a single frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transport has been closed and can never be reopened.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns true if the adapter can never deliver frames again.
    ///
    /// Every other variant is transient: the caller keeps calling the adapter,
    /// which owns its own reconnection policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Closed)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_closed_is_fatal() {
        assert!(TransportError::Closed.is_fatal());
        assert!(!TransportError::Disconnected("peer gone".into()).is_fatal());
        assert!(!TransportError::Io(std::io::Error::other("boom")).is_fatal());
        assert!(!TransportError::PayloadTooLarge { size: 9, max: 8 }.is_fatal());
    }
}
