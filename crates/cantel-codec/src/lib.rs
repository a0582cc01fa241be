//! Signal table and frame codec for CAN-style motor telemetry.
//!
//! Every frame is an identifier plus a short big-endian payload:
//! - Unsigned and signed 16-bit scalars, scaled to engineering units
//! - A fault bitmask whose low five bits are independent flags
//!
//! Decoding never fails for routine bad input; unknown identifiers and bad
//! payload lengths come back as [`DecodeResult`] variants.

pub mod codec;
pub mod error;
pub mod fault;
pub mod signal;

pub use codec::{
    decode, decode_at, encode, encode_faults, wire_payload, DecodeResult, DecodedFrame, Value,
    RAW_SIZE,
};
pub use error::{EncodeError, ParseFaultError, Result};
pub use fault::{FaultFlag, FaultSet};
pub use signal::{
    find, lookup, signal_name, signals, SignalDescriptor, SignalKind, DC_BUS_VOLTAGE,
    FAULT_FLAGS, MOTOR_RPM, PHASE_CURRENT, TEMPERATURE, TORQUE,
};
