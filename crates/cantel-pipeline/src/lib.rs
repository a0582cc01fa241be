//! Ingestion pipeline and telemetry store.
//!
//! This is the concurrent half of cantel. A single background loop pulls raw
//! frames from a [`FrameSource`](cantel_transport::FrameSource), decodes them and
//! appends them to a [`TelemetryStore`]; consumers poll the store and the
//! [`Diagnostics`] counters at their own cadence.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod shutdown;
pub mod store;

pub use config::{
    PipelineConfig, StoreConfig, DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_THREAD_NAME,
};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot, TransportStatus};
pub use error::{PipelineError, Result, StoreError};
pub use pipeline::{IngestReport, Pipeline, PipelineHandle, StopReason};
pub use shutdown::ShutdownToken;
pub use store::{StoreWriter, TelemetryStore};
