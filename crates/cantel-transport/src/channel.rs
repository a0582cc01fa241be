use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::datagram::MAX_PAYLOAD;
use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource, RawFrame};

/// Default wait used by [`ChannelTransport::receive`] before reporting "no data".
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

type Item = std::result::Result<RawFrame, TransportError>;

/// In-process frame source backed by an mpsc channel.
///
/// Once every [`ChannelSender`] is dropped and the queue drains, `receive` fails
/// with the fatal [`TransportError::Closed`].
#[derive(Debug)]
pub struct ChannelTransport {
    rx: Receiver<Item>,
    recv_timeout: Duration,
}

/// Sending half of a [`ChannelTransport`]. Cloneable.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    tx: Sender<Item>,
}

impl ChannelTransport {
    /// Create a connected sender/source pair with the default receive timeout.
    pub fn pair() -> (ChannelSender, ChannelTransport) {
        Self::pair_with_timeout(DEFAULT_RECV_TIMEOUT)
    }

    /// Create a connected pair with an explicit receive timeout.
    pub fn pair_with_timeout(recv_timeout: Duration) -> (ChannelSender, ChannelTransport) {
        let (tx, rx) = mpsc::channel();
        (ChannelSender { tx }, ChannelTransport { rx, recv_timeout })
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "in-memory-channel"
    }
}

impl FrameSource for ChannelTransport {
    fn receive(&mut self) -> Result<Option<RawFrame>> {
        match self.rx.recv_timeout(self.recv_timeout) {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(err)) => Err(err),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("all channel senders dropped");
                Err(TransportError::Closed)
            }
        }
    }
}

impl ChannelSender {
    /// Queue an already-built raw frame, preserving its receive instant.
    pub fn send_raw(&self, frame: RawFrame) -> Result<()> {
        self.tx.send(Ok(frame)).map_err(|_| TransportError::Closed)
    }

    /// Queue an error for the source to report on its next `receive`.
    pub fn inject_error(&self, err: TransportError) -> Result<()> {
        self.tx.send(Err(err)).map_err(|_| TransportError::Closed)
    }
}

impl FrameSink for ChannelSender {
    fn send(&mut self, id: u16, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        self.send_raw(RawFrame::new(id, Bytes::copy_from_slice(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_frames_in_order() {
        let (mut tx, mut rx) = ChannelTransport::pair();
        tx.send(0x100, &[0x05, 0xDC]).unwrap();
        tx.send(0x101, &[0x02, 0xF3]).unwrap();

        let f1 = rx.receive().unwrap().unwrap();
        let f2 = rx.receive().unwrap().unwrap();
        assert_eq!((f1.id, f1.payload.as_ref()), (0x100, [0x05, 0xDC].as_ref()));
        assert_eq!((f2.id, f2.payload.as_ref()), (0x101, [0x02, 0xF3].as_ref()));
        assert!(f1.received_at <= f2.received_at);
    }

    #[test]
    fn empty_queue_times_out_with_none() {
        let (_tx, mut rx) = ChannelTransport::pair_with_timeout(Duration::from_millis(5));
        assert!(rx.receive().unwrap().is_none());
    }

    #[test]
    fn dropped_sender_is_fatal() {
        let (tx, mut rx) = ChannelTransport::pair_with_timeout(Duration::from_millis(5));
        drop(tx);
        let err = rx.receive().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn queued_frames_drain_before_close() {
        let (mut tx, mut rx) = ChannelTransport::pair_with_timeout(Duration::from_millis(5));
        tx.send(0x103, &[0x15, 0x8E]).unwrap();
        drop(tx);

        assert_eq!(rx.receive().unwrap().unwrap().id, 0x103);
        assert!(matches!(rx.receive(), Err(TransportError::Closed)));
    }

    #[test]
    fn injected_errors_surface_once() {
        let (tx, mut rx) = ChannelTransport::pair_with_timeout(Duration::from_millis(5));
        tx.inject_error(TransportError::Disconnected("link down".into()))
            .unwrap();
        tx.send_raw(RawFrame::new(0x100, vec![0x00, 0x01])).unwrap();

        let err = rx.receive().unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(rx.receive().unwrap().unwrap().id, 0x100);
    }

    #[test]
    fn send_rejects_oversized_payload() {
        let (mut tx, _rx) = ChannelTransport::pair();
        let err = tx.send(0x100, &[0u8; 9]).unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge { .. }));
    }

    #[test]
    fn send_after_source_dropped_is_closed() {
        let (mut tx, rx) = ChannelTransport::pair();
        drop(rx);
        assert!(matches!(tx.send(0x100, &[0, 1]), Err(TransportError::Closed)));
    }
}
