/// Errors that can occur while encoding an engineering value.
///
/// Decoding never fails; see [`DecodeResult`](crate::DecodeResult).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// The identifier is not in the signal table.
    #[error("unknown signal id 0x{0:03X}")]
    UnknownId(u16),

    /// The value does not fit the signal's raw width after scaling.
    #[error("value {value} out of range for signal 0x{id:03X} (raw {min}..={max})")]
    OutOfRange {
        id: u16,
        value: f64,
        min: i64,
        max: i64,
    },
}

/// A fault flag name that does not match any known flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fault flag: {0}")]
pub struct ParseFaultError(pub String);

pub type Result<T> = std::result::Result<T, EncodeError>;
