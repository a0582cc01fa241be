use std::time::Instant;

use bytes::Bytes;

use crate::error::{EncodeError, Result};
use crate::fault::FaultSet;
use crate::signal::{lookup, SignalDescriptor, SignalKind};

/// Width of the normalized raw payload kept with every decoded frame.
pub const RAW_SIZE: usize = 2;

/// A decoded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Scaled engineering quantity.
    Numeric(f64),
    /// Active fault flags.
    Faults(FaultSet),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Faults(_) => None,
        }
    }

    pub fn faults(&self) -> Option<FaultSet> {
        match self {
            Value::Faults(set) => Some(*set),
            Value::Numeric(_) => None,
        }
    }
}

/// One successfully decoded frame. Immutable once built.
///
/// `raw_bytes` is always the two-byte big-endian form; a single-byte fault
/// payload is stored as `[0x00, mask]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedFrame {
    pub id: u16,
    pub raw_bytes: [u8; RAW_SIZE],
    pub timestamp: Instant,
    pub value: Value,
}

impl DecodedFrame {
    /// The table entry this frame was decoded with.
    pub fn descriptor(&self) -> Option<&'static SignalDescriptor> {
        lookup(self.id)
    }

    /// Raw bytes as spaced upper-case hex, e.g. `"05 DC"`.
    pub fn hex(&self) -> String {
        self.raw_bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Display form: `"1500.00 RPM"`, the active fault labels, or `"System normal"`.
    pub fn formatted_value(&self) -> String {
        match self.value {
            Value::Numeric(v) => {
                let unit = self.descriptor().map(|d| d.unit).unwrap_or("");
                if unit.is_empty() {
                    format!("{v:.2}")
                } else {
                    format!("{v:.2} {unit}")
                }
            }
            Value::Faults(set) if set.is_empty() => "System normal".to_string(),
            Value::Faults(set) => set.to_string(),
        }
    }
}

/// Outcome of decoding one frame.
///
/// Unknown identifiers and bad payload lengths are expected on an unreliable
/// transport, so they are values rather than errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    Decoded(DecodedFrame),
    /// The identifier is not in the signal table.
    UnknownId { id: u16, bytes: Bytes },
    /// The payload length does not match the signal's layout.
    Malformed { id: u16, len: usize },
}

impl DecodeResult {
    pub fn id(&self) -> u16 {
        match self {
            DecodeResult::Decoded(frame) => frame.id,
            DecodeResult::UnknownId { id, .. } | DecodeResult::Malformed { id, .. } => *id,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, DecodeResult::Decoded(_))
    }

    pub fn frame(&self) -> Option<&DecodedFrame> {
        match self {
            DecodeResult::Decoded(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn into_frame(self) -> Option<DecodedFrame> {
        match self {
            DecodeResult::Decoded(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Decode a payload, stamping the frame with the current instant.
pub fn decode(id: u16, bytes: &[u8]) -> DecodeResult {
    decode_at(id, bytes, Instant::now())
}

/// Decode a payload received at `timestamp`.
///
/// Numeric signals need exactly two big-endian bytes. Fault frames accept their
/// single wire byte or the two-byte form, where the second byte is the mask.
pub fn decode_at(id: u16, bytes: &[u8], timestamp: Instant) -> DecodeResult {
    let Some(desc) = lookup(id) else {
        return DecodeResult::UnknownId {
            id,
            bytes: Bytes::copy_from_slice(bytes),
        };
    };

    let raw_bytes = match (desc.kind, bytes) {
        (SignalKind::Bitmask, [mask]) => [0x00, *mask],
        (_, [hi, lo]) => [*hi, *lo],
        _ => {
            return DecodeResult::Malformed {
                id,
                len: bytes.len(),
            }
        }
    };

    let value = match desc.kind {
        SignalKind::UInt16BE => {
            Value::Numeric(desc.to_engineering(u16::from_be_bytes(raw_bytes) as i64))
        }
        // Sign comes from the high bit of the first byte.
        SignalKind::Int16BE => {
            Value::Numeric(desc.to_engineering(i16::from_be_bytes(raw_bytes) as i64))
        }
        SignalKind::Bitmask => Value::Faults(FaultSet::from_byte(raw_bytes[1])),
    };

    DecodeResult::Decoded(DecodedFrame {
        id,
        raw_bytes,
        timestamp,
        value,
    })
}

/// Encode an engineering value into the two-byte big-endian payload.
///
/// The value is scaled and rounded to the nearest raw integer. Values that do
/// not fit the signal's width are rejected, never clamped. For the fault signal
/// the value is the mask itself and lands in the low byte.
pub fn encode(id: u16, value: f64) -> Result<[u8; RAW_SIZE]> {
    let desc = lookup(id).ok_or(EncodeError::UnknownId(id))?;
    let (min, max) = desc.kind.raw_range();
    let out_of_range = EncodeError::OutOfRange {
        id,
        value,
        min,
        max,
    };

    if !value.is_finite() {
        return Err(out_of_range);
    }
    let raw = desc.to_raw(value);
    if raw < min as f64 || raw > max as f64 {
        return Err(out_of_range);
    }
    // A mask is exact: no rounding, no bits outside the known flags.
    if desc.is_bitmask() && (value.fract() != 0.0 || (raw as u8 & !FaultSet::KNOWN_BITS) != 0) {
        return Err(out_of_range);
    }

    let raw = raw as i64;
    Ok(match desc.kind {
        SignalKind::UInt16BE => (raw as u16).to_be_bytes(),
        SignalKind::Int16BE => (raw as i16).to_be_bytes(),
        SignalKind::Bitmask => [0x00, raw as u8],
    })
}

/// Encode a fault set into the two-byte payload form.
pub fn encode_faults(faults: FaultSet) -> [u8; RAW_SIZE] {
    [0x00, faults.bits()]
}

/// The bytes that actually go on the wire for a two-byte payload.
///
/// Fault frames carry only their mask byte; every other signal sends both bytes.
pub fn wire_payload(id: u16, raw: &[u8; RAW_SIZE]) -> &[u8] {
    match lookup(id) {
        Some(desc) if desc.is_bitmask() => &raw[1..],
        _ => &raw[..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultFlag;
    use crate::signal::{
        signals, DC_BUS_VOLTAGE, FAULT_FLAGS, MOTOR_RPM, PHASE_CURRENT, TEMPERATURE, TORQUE,
    };

    fn numeric(id: u16, bytes: &[u8]) -> f64 {
        decode(id, bytes)
            .into_frame()
            .and_then(|f| f.value.as_f64())
            .expect("numeric decode")
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn decode_rpm_unsigned() {
        assert_close(numeric(MOTOR_RPM, &[0x05, 0xDC]), 1500.0, 1e-9);
        // High bit set must stay unsigned.
        assert_close(numeric(MOTOR_RPM, &[0xFF, 0xFF]), 65535.0, 1e-9);
    }

    #[test]
    fn decode_temperature_signed() {
        assert_close(numeric(TEMPERATURE, &[0x02, 0xF3]), 75.5, 1e-9);
        assert_close(numeric(TEMPERATURE, &[0xFF, 0x9C]), -10.0, 1e-9);
        assert_close(numeric(TEMPERATURE, &[0x80, 0x00]), -3276.8, 1e-9);
    }

    #[test]
    fn decode_torque_voltage_current() {
        assert_close(numeric(TORQUE, &[0x12, 0x5E]), 47.02, 1e-9);
        assert_close(numeric(TORQUE, &[0x12, 0x8E]), 47.50, 1e-9);
        assert_close(numeric(DC_BUS_VOLTAGE, &[0x15, 0x8E]), 551.8, 1e-9);
        assert_close(numeric(DC_BUS_VOLTAGE, &[0x15, 0xA6]), 554.2, 1e-9);
        assert_close(numeric(PHASE_CURRENT, &[0x08, 0x34]), 21.0, 1e-9);
        assert_close(numeric(PHASE_CURRENT, &[0x08, 0x24]), 20.84, 1e-9);
        assert_close(numeric(PHASE_CURRENT, &[0xF7, 0xDC]), -20.84, 1e-9);
    }

    #[test]
    fn decode_fault_frames() {
        let faults = |bytes: &[u8]| {
            decode(FAULT_FLAGS, bytes)
                .into_frame()
                .and_then(|f| f.value.faults())
                .expect("fault decode")
        };

        assert_eq!(faults(&[0x01]).iter().collect::<Vec<_>>(), vec![FaultFlag::Overheat]);
        assert_eq!(faults(&[0x00, 0x03]).bits(), 0x03);
        assert!(faults(&[0x00]).is_empty());
        assert_eq!(faults(&[0xFF]).len(), 5);
        // Only the low byte of a padded payload counts.
        assert!(faults(&[0xFF, 0x00]).is_empty());
    }

    #[test]
    fn single_byte_fault_frame_is_normalized() {
        let frame = decode(FAULT_FLAGS, &[0x05]).into_frame().unwrap();
        assert_eq!(frame.raw_bytes, [0x00, 0x05]);
        assert_eq!(frame.hex(), "00 05");
    }

    #[test]
    fn unknown_id_keeps_bytes() {
        let result = decode(0x7FF, &[0xDE, 0xAD, 0xBE]);
        match result {
            DecodeResult::UnknownId { id, bytes } => {
                assert_eq!(id, 0x7FF);
                assert_eq!(bytes.as_ref(), &[0xDE, 0xAD, 0xBE]);
            }
            other => panic!("expected UnknownId, got {other:?}"),
        }
    }

    #[test]
    fn wrong_length_is_malformed() {
        for len in [0usize, 1, 3, 8] {
            let bytes = vec![0xAB; len];
            assert_eq!(
                decode(TORQUE, &bytes),
                DecodeResult::Malformed { id: TORQUE, len },
                "len {len}"
            );
        }
        assert_eq!(
            decode(FAULT_FLAGS, &[]),
            DecodeResult::Malformed {
                id: FAULT_FLAGS,
                len: 0
            }
        );
        assert_eq!(
            decode(FAULT_FLAGS, &[0, 0, 1]),
            DecodeResult::Malformed {
                id: FAULT_FLAGS,
                len: 3
            }
        );
    }

    #[test]
    fn every_two_byte_payload_decodes_for_known_ids() {
        for desc in signals() {
            for raw in (0..=u16::MAX).step_by(97).chain([u16::MAX, 0x8000, 0x7FFF]) {
                let result = decode(desc.id, &raw.to_be_bytes());
                assert!(result.is_decoded(), "0x{:03X} {raw:04X}", desc.id);
            }
        }
    }

    #[test]
    fn decode_at_keeps_timestamp() {
        let at = Instant::now();
        let frame = decode_at(MOTOR_RPM, &[0, 1], at).into_frame().unwrap();
        assert_eq!(frame.timestamp, at);
        assert_eq!(frame.id, MOTOR_RPM);
        assert_eq!(frame.raw_bytes, [0, 1]);
    }

    #[test]
    fn encode_known_values() {
        assert_eq!(encode(MOTOR_RPM, 1500.0).unwrap(), [0x05, 0xDC]);
        assert_eq!(encode(TEMPERATURE, 75.5).unwrap(), [0x02, 0xF3]);
        assert_eq!(encode(TEMPERATURE, -10.0).unwrap(), [0xFF, 0x9C]);
        assert_eq!(encode(TORQUE, 47.5).unwrap(), [0x12, 0x8E]);
        assert_eq!(encode(DC_BUS_VOLTAGE, 554.2).unwrap(), [0x15, 0xA6]);
        assert_eq!(encode(PHASE_CURRENT, -20.84).unwrap(), [0xF7, 0xDC]);
        assert_eq!(encode(FAULT_FLAGS, 3.0).unwrap(), [0x00, 0x03]);
    }

    #[test]
    fn encode_rounds_to_resolution() {
        assert_eq!(encode(TEMPERATURE, 75.54).unwrap(), [0x02, 0xF3]);
        assert_eq!(encode(TEMPERATURE, 75.56).unwrap(), [0x02, 0xF4]);
        assert_eq!(encode(MOTOR_RPM, 1499.6).unwrap(), [0x05, 0xDC]);
    }

    #[test]
    fn encode_rejects_out_of_range() {
        assert!(matches!(
            encode(MOTOR_RPM, -1.0),
            Err(EncodeError::OutOfRange { id: MOTOR_RPM, min: 0, max: 65535, .. })
        ));
        assert!(matches!(
            encode(MOTOR_RPM, 65535.6),
            Err(EncodeError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(TEMPERATURE, 3276.8),
            Err(EncodeError::OutOfRange { min: -32768, max: 32767, .. })
        ));
        assert!(encode(TEMPERATURE, 3276.7).is_ok());
        assert!(encode(TEMPERATURE, -3276.8).is_ok());
        assert!(matches!(
            encode(FAULT_FLAGS, 256.0),
            Err(EncodeError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(TORQUE, f64::NAN),
            Err(EncodeError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(TORQUE, f64::INFINITY),
            Err(EncodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn encode_rejects_inexact_fault_masks() {
        assert_eq!(encode(FAULT_FLAGS, 31.0).unwrap(), [0x00, 0x1F]);
        assert_eq!(encode(FAULT_FLAGS, 0.0).unwrap(), [0x00, 0x00]);
        for value in [32.0, 0x83 as f64, 255.0, 2.5, 0.4] {
            assert!(
                matches!(
                    encode(FAULT_FLAGS, value),
                    Err(EncodeError::OutOfRange { id: FAULT_FLAGS, .. })
                ),
                "mask {value} should be rejected"
            );
        }
    }

    #[test]
    fn encode_unknown_id() {
        assert_eq!(encode(0x105, 1.0), Err(EncodeError::UnknownId(0x105)));
        assert_eq!(encode(0x000, 0.0), Err(EncodeError::UnknownId(0x000)));
    }

    #[test]
    fn roundtrip_within_resolution() {
        for desc in signals().iter().filter(|d| !d.is_bitmask()) {
            let (lo, hi) = desc.range();
            let steps = 1000;
            for i in 0..=steps {
                let value = lo + (hi - lo) * (i as f64 / steps as f64);
                let bytes = encode(desc.id, value).unwrap();
                let back = numeric(desc.id, &bytes);
                assert_close(back, value, desc.resolution() / 2.0 + 1e-9);
            }
        }
    }

    #[test]
    fn fault_roundtrip_through_wire_payload() {
        let set: FaultSet = [FaultFlag::Overcurrent, FaultFlag::EncoderFault]
            .into_iter()
            .collect();
        let raw = encode_faults(set);
        let wire = wire_payload(FAULT_FLAGS, &raw);
        assert_eq!(wire, &[0x12]);

        let decoded = decode(FAULT_FLAGS, wire).into_frame().unwrap();
        assert_eq!(decoded.value, Value::Faults(set));
    }

    #[test]
    fn wire_payload_keeps_numeric_bytes() {
        let raw = [0x05, 0xDC];
        assert_eq!(wire_payload(MOTOR_RPM, &raw), &[0x05, 0xDC]);
        assert_eq!(wire_payload(0x7FF, &raw), &[0x05, 0xDC]);
    }

    #[test]
    fn formatted_values() {
        let rpm = decode(MOTOR_RPM, &[0x05, 0xDC]).into_frame().unwrap();
        assert_eq!(rpm.formatted_value(), "1500.00 RPM");

        let temp = decode(TEMPERATURE, &[0x02, 0xF3]).into_frame().unwrap();
        assert_eq!(temp.formatted_value(), "75.50 °C");

        let ok = decode(FAULT_FLAGS, &[0x00]).into_frame().unwrap();
        assert_eq!(ok.formatted_value(), "System normal");

        let bad = decode(FAULT_FLAGS, &[0x09]).into_frame().unwrap();
        assert_eq!(bad.formatted_value(), "OVERHEAT | COMM LOSS");
    }
}
