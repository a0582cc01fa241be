use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::RawFrame;

/// Identifier header: big-endian u16.
pub const ID_HEADER_SIZE: usize = 2;

/// Largest payload a frame may carry (classic CAN data field).
pub const MAX_PAYLOAD: usize = 8;

/// Largest datagram the UDP adapter reads; anything longer is truncated.
pub const MAX_DATAGRAM_SIZE: usize = ID_HEADER_SIZE + MAX_PAYLOAD;

/// Encode one frame into the datagram layout.
///
/// Wire format:
/// ```text
/// ┌──────────────┬────────────────────┐
/// │ Id (2B BE)   │ Payload (0..=8 B)  │
/// └──────────────┴────────────────────┘
/// ```
pub fn encode_datagram(id: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(TransportError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(ID_HEADER_SIZE + payload.len());
    dst.put_u16(id);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one datagram into a raw frame.
///
/// Never fails: a datagram too short to carry the id header cannot name a signal,
/// so it is surfaced under id `0` with whatever bytes it had, and the codec reports
/// it as unknown. Payload length is left for the codec to judge.
pub fn decode_datagram(datagram: &[u8], received_at: Instant) -> RawFrame {
    match datagram {
        [hi, lo, payload @ ..] => RawFrame::at(
            u16::from_be_bytes([*hi, *lo]),
            Bytes::copy_from_slice(payload),
            received_at,
        ),
        short => RawFrame::at(0, Bytes::copy_from_slice(short), received_at),
    }
}
