/// Errors raised while building a telemetry store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A capacity was configured as zero.
    #[error("{field} must be greater than zero")]
    InvalidCapacity { field: &'static str },
}

/// Errors that end the ingestion pipeline.
///
/// Routine bad frames and transient transport outages never show up here; they
/// are counted in [`Diagnostics`](crate::Diagnostics) instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The transport reported it can never deliver again.
    #[error("transport error: {0}")]
    Transport(#[from] cantel_transport::TransportError),

    /// Store construction failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The ingestion thread could not be started.
    #[error("failed to spawn ingestion thread: {0}")]
    Spawn(std::io::Error),

    /// The ingestion thread panicked.
    #[error("ingestion thread panicked")]
    Panicked,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
