//! Fault flags carried by the fault bitmask frame.
//!
//! Bits 0-4 are defined; bits 5-7 are reserved and silently dropped on decode.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ParseFaultError;

/// One fault condition, identified by its bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultFlag {
    Overheat = 0,
    Overcurrent = 1,
    Undervoltage = 2,
    CommLoss = 3,
    EncoderFault = 4,
}

impl FaultFlag {
    /// Every flag, in bit order.
    pub const ALL: [FaultFlag; 5] = [
        FaultFlag::Overheat,
        FaultFlag::Overcurrent,
        FaultFlag::Undervoltage,
        FaultFlag::CommLoss,
        FaultFlag::EncoderFault,
    ];

    /// The flag's mask within the payload byte.
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Operator-facing label.
    pub fn label(self) -> &'static str {
        match self {
            FaultFlag::Overheat => "OVERHEAT",
            FaultFlag::Overcurrent => "OVERCURRENT",
            FaultFlag::Undervoltage => "UNDERVOLTAGE",
            FaultFlag::CommLoss => "COMM LOSS",
            FaultFlag::EncoderFault => "ENCODER FAULT",
        }
    }
}

impl fmt::Display for FaultFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FaultFlag {
    type Err = ParseFaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "overheat" => Ok(FaultFlag::Overheat),
            "overcurrent" => Ok(FaultFlag::Overcurrent),
            "undervoltage" => Ok(FaultFlag::Undervoltage),
            "comm_loss" | "commloss" => Ok(FaultFlag::CommLoss),
            "encoder_fault" | "encoder" => Ok(FaultFlag::EncoderFault),
            _ => Err(ParseFaultError(s.to_string())),
        }
    }
}

/// Set of active fault flags, stored as the payload byte with reserved bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaultSet(u8);

impl FaultSet {
    /// Mask of the defined bits.
    pub const KNOWN_BITS: u8 = 0b0001_1111;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Interpret a payload byte. Reserved bits are ignored.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte & Self::KNOWN_BITS)
    }

    /// The payload byte for this set.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, flag: FaultFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: FaultFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: FaultFlag) {
        self.0 &= !flag.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Active flags in bit order.
    pub fn iter(self) -> impl Iterator<Item = FaultFlag> {
        FaultFlag::ALL.into_iter().filter(move |flag| self.contains(*flag))
    }

    /// Labels of the active flags in bit order.
    pub fn labels(self) -> Vec<&'static str> {
        self.iter().map(FaultFlag::label).collect()
    }
}

impl FromIterator<FaultFlag> for FaultSet {
    fn from_iter<I: IntoIterator<Item = FaultFlag>>(iter: I) -> Self {
        let mut set = FaultSet::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Display for FaultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels().join(" | "))
    }
}

impl Serialize for FaultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
