use std::time::Instant;

use bytes::Bytes;

use crate::error::Result;

/// One frame as delivered by a transport, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame identifier.
    pub id: u16,
    /// Payload bytes exactly as received; length is not validated here.
    pub payload: Bytes,
    /// Monotonic receive time.
    pub received_at: Instant,
}

impl RawFrame {
    /// Create a frame stamped with the current instant.
    pub fn new(id: u16, payload: impl Into<Bytes>) -> Self {
        Self::at(id, payload, Instant::now())
    }

    /// Create a frame with an explicit receive instant.
    pub fn at(id: u16, payload: impl Into<Bytes>, received_at: Instant) -> Self {
        Self {
            id,
            payload: payload.into(),
            received_at,
        }
    }
}

/// A source of raw frames.
///
/// `receive` may block for up to an adapter-defined timeout. `Ok(None)` means no
/// frame arrived within that window; it is not an error. Transient errors leave the
/// source usable (the adapter reconnects on its own schedule), while an error for
/// which [`TransportError::is_fatal`](crate::TransportError::is_fatal) is true means
/// the source will never deliver again.
pub trait FrameSource {
    fn receive(&mut self) -> Result<Option<RawFrame>>;
}

/// A sink for raw frames.
pub trait FrameSink {
    fn send(&mut self, id: u16, payload: &[u8]) -> Result<()>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn receive(&mut self) -> Result<Option<RawFrame>> {
        (**self).receive()
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn send(&mut self, id: u16, payload: &[u8]) -> Result<()> {
        (**self).send(id, payload)
    }
}
