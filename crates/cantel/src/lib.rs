//! Motor telemetry over CAN-style frames.
//!
//! cantel decodes a small fixed signal table (speed, temperature, torque, bus
//! voltage, phase current and a fault bitmask) from frames carried over UDP,
//! and keeps a bounded, thread-safe history that dashboards can poll.
//!
//! # Crate Structure
//!
//! - [`transport`] - Frame sources and sinks (UDP unicast/multicast, in-process channels)
//! - [`codec`] - Signal table, decoding and encoding of frame payloads
//! - [`pipeline`] - Background ingestion loop, diagnostics and the telemetry store

/// Re-export transport types.
pub mod transport {
    pub use cantel_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use cantel_codec::*;
}

/// Re-export pipeline and store types.
pub mod pipeline {
    pub use cantel_pipeline::*;
}
