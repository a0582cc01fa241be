//! The fixed signal table.
//!
//! Every identifier the codec understands is listed here, once. The table is a
//! `static` sorted by id and is never mutated.

use serde::Serialize;

/// Motor speed.
pub const MOTOR_RPM: u16 = 0x100;

/// Winding temperature.
pub const TEMPERATURE: u16 = 0x101;

/// Shaft torque.
pub const TORQUE: u16 = 0x102;

/// DC bus voltage.
pub const DC_BUS_VOLTAGE: u16 = 0x103;

/// Phase current.
pub const PHASE_CURRENT: u16 = 0x104;

/// Fault bitmask.
pub const FAULT_FLAGS: u16 = 0x1FF;

/// How a payload maps to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SignalKind {
    /// Big-endian unsigned 16-bit integer.
    #[serde(rename = "uint16_be")]
    UInt16BE,
    /// Big-endian two's-complement 16-bit integer.
    #[serde(rename = "int16_be")]
    Int16BE,
    /// Fault flags in the low byte.
    #[serde(rename = "bitmask")]
    Bitmask,
}

impl SignalKind {
    /// Payload width on the wire.
    ///
    /// Fault frames travel with a single byte; the codec also accepts them padded
    /// to two bytes.
    pub fn payload_len(self) -> usize {
        match self {
            SignalKind::UInt16BE | SignalKind::Int16BE => 2,
            SignalKind::Bitmask => 1,
        }
    }

    /// Inclusive range of the raw integer.
    pub fn raw_range(self) -> (i64, i64) {
        match self {
            SignalKind::UInt16BE => (0, u16::MAX as i64),
            SignalKind::Int16BE => (i16::MIN as i64, i16::MAX as i64),
            SignalKind::Bitmask => (0, u8::MAX as i64),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::UInt16BE => "uint16_be",
            SignalKind::Int16BE => "int16_be",
            SignalKind::Bitmask => "bitmask",
        }
    }
}

/// Decode/encode rule for one identifier.
///
/// `engineering = raw / scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalDescriptor {
    pub id: u16,
    /// Short machine-friendly name, used on the command line.
    pub key: &'static str,
    pub name: &'static str,
    pub kind: SignalKind,
    pub scale: f64,
    pub offset: f64,
    pub unit: &'static str,
}

impl SignalDescriptor {
    /// Smallest engineering step this signal can express.
    pub fn resolution(&self) -> f64 {
        1.0 / self.scale
    }

    /// Inclusive engineering range representable on the wire.
    pub fn range(&self) -> (f64, f64) {
        let (min, max) = self.kind.raw_range();
        (self.to_engineering(min), self.to_engineering(max))
    }

    /// Convert a raw integer to its engineering value.
    pub fn to_engineering(&self, raw: i64) -> f64 {
        raw as f64 / self.scale + self.offset
    }

    /// Convert an engineering value to the nearest raw integer, unchecked.
    pub fn to_raw(&self, value: f64) -> f64 {
        ((value - self.offset) * self.scale).round()
    }

    pub fn is_bitmask(&self) -> bool {
        self.kind == SignalKind::Bitmask
    }
}

static SIGNALS: [SignalDescriptor; 6] = [
    SignalDescriptor {
        id: MOTOR_RPM,
        key: "rpm",
        name: "Motor RPM",
        kind: SignalKind::UInt16BE,
        scale: 1.0,
        offset: 0.0,
        unit: "RPM",
    },
    SignalDescriptor {
        id: TEMPERATURE,
        key: "temperature",
        name: "Temperature",
        kind: SignalKind::Int16BE,
        scale: 10.0,
        offset: 0.0,
        unit: "°C",
    },
    SignalDescriptor {
        id: TORQUE,
        key: "torque",
        name: "Torque",
        kind: SignalKind::Int16BE,
        scale: 100.0,
        offset: 0.0,
        unit: "N·m",
    },
    SignalDescriptor {
        id: DC_BUS_VOLTAGE,
        key: "voltage",
        name: "DC Bus Voltage",
        kind: SignalKind::UInt16BE,
        scale: 10.0,
        offset: 0.0,
        unit: "V",
    },
    SignalDescriptor {
        id: PHASE_CURRENT,
        key: "current",
        name: "Phase Current",
        kind: SignalKind::Int16BE,
        scale: 100.0,
        offset: 0.0,
        unit: "A",
    },
    SignalDescriptor {
        id: FAULT_FLAGS,
        key: "faults",
        name: "Fault Flags",
        kind: SignalKind::Bitmask,
        scale: 1.0,
        offset: 0.0,
        unit: "",
    },
];

/// Look up the descriptor for an identifier.
pub fn lookup(id: u16) -> Option<&'static SignalDescriptor> {
    SIGNALS
        .binary_search_by_key(&id, |desc| desc.id)
        .ok()
        .map(|idx| &SIGNALS[idx])
}

/// Every descriptor, in id order.
pub fn signals() -> &'static [SignalDescriptor] {
    &SIGNALS
}

/// Find a descriptor by its short key or display name (case-insensitive).
pub fn find(name: &str) -> Option<&'static SignalDescriptor> {
    let name = name.trim();
    SIGNALS
        .iter()
        .find(|desc| desc.key.eq_ignore_ascii_case(name) || desc.name.eq_ignore_ascii_case(name))
}

/// Returns a human-readable name for an identifier.
pub fn signal_name(id: u16) -> &'static str {
    lookup(id).map(|desc| desc.name).unwrap_or("UNKNOWN")
}
