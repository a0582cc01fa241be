use crate::error::StoreError;

/// Default per-signal history depth.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default depth of the cross-signal event log.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 200;

/// Default name of the ingestion thread.
pub const DEFAULT_THREAD_NAME: &str = "cantel-ingest";

/// Capacities of the telemetry store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Frames kept per identifier. Oldest are evicted first.
    pub history_capacity: usize,
    /// Frames kept in the event log across all identifiers.
    pub event_log_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.history_capacity == 0 {
            return Err(StoreError::InvalidCapacity {
                field: "history_capacity",
            });
        }
        if self.event_log_capacity == 0 {
            return Err(StoreError::InvalidCapacity {
                field: "event_log_capacity",
            });
        }
        Ok(())
    }
}

/// Configuration for the ingestion loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Stop after this many decoded frames. `None` runs until shutdown.
    pub max_frames: Option<u64>,
    /// Name given to the spawned ingestion thread.
    pub thread_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}
