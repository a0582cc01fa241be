use std::sync::Arc;
use std::thread::JoinHandle;

use cantel_codec::{decode_at, DecodeResult};
use cantel_transport::{FrameSource, RawFrame};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot, TransportStatus};
use crate::error::{PipelineError, Result};
use crate::shutdown::ShutdownToken;
use crate::store::{StoreWriter, TelemetryStore};

/// Why the ingestion loop returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The shutdown token was cancelled.
    Shutdown,
    /// `max_frames` decoded frames were recorded.
    FrameLimit,
}

/// Summary returned when the ingestion loop exits cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub reason: StopReason,
    pub diagnostics: DiagnosticsSnapshot,
}

/// Single-threaded ingestion loop: transport → codec → store.
///
/// Owns the store's only writer, so frames land in arrival order. Bad frames
/// and transient transport errors are counted and skipped; only a fatal
/// transport error ends the loop with an error.
pub struct Pipeline<S> {
    source: S,
    writer: StoreWriter,
    diagnostics: Arc<Diagnostics>,
    config: PipelineConfig,
}

impl<S: FrameSource> Pipeline<S> {
    /// Create a pipeline with default configuration.
    pub fn new(source: S, writer: StoreWriter) -> Self {
        Self::with_config(source, writer, PipelineConfig::default())
    }

    /// Create a pipeline with explicit configuration.
    pub fn with_config(source: S, writer: StoreWriter, config: PipelineConfig) -> Self {
        Self {
            source,
            writer,
            diagnostics: Arc::new(Diagnostics::new()),
            config,
        }
    }

    /// Shared counters, readable while the loop runs.
    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        Arc::clone(&self.diagnostics)
    }

    /// A read handle onto the store this pipeline feeds.
    pub fn store(&self) -> TelemetryStore {
        self.writer.store()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the loop on the calling thread until shutdown, the frame limit, or a
    /// fatal transport error.
    pub fn run(mut self, shutdown: &ShutdownToken) -> Result<IngestReport> {
        info!(max_frames = ?self.config.max_frames, "ingestion pipeline started");
        let mut decoded = 0u64;

        let reason = loop {
            if self.config.max_frames.is_some_and(|max| decoded >= max) {
                break StopReason::FrameLimit;
            }
            if shutdown.is_cancelled() {
                break StopReason::Shutdown;
            }

            match self.source.receive() {
                Ok(Some(raw)) => {
                    self.mark_up();
                    if self.apply(raw) {
                        decoded += 1;
                    }
                }
                Ok(None) => self.mark_up(),
                Err(err) if err.is_fatal() => {
                    self.diagnostics.set_status(TransportStatus::Closed);
                    error!(error = %err, "transport closed, ingestion stopping");
                    return Err(PipelineError::Transport(err));
                }
                Err(err) => {
                    self.diagnostics.record_transport_error();
                    let previous = self.diagnostics.set_status(TransportStatus::Unavailable);
                    if previous == TransportStatus::Unavailable {
                        debug!(error = %err, "transport still unavailable");
                    } else {
                        warn!(error = %err, "transport unavailable");
                    }
                }
            }
        };

        self.diagnostics.set_status(TransportStatus::Stopped);
        let diagnostics = self.diagnostics.snapshot();
        info!(
            ?reason,
            decoded = diagnostics.decoded,
            rejected = diagnostics.rejected(),
            "ingestion pipeline stopped"
        );
        Ok(IngestReport {
            reason,
            diagnostics,
        })
    }

    /// Decode one raw frame and record it. Returns true if it was stored.
    fn apply(&mut self, raw: RawFrame) -> bool {
        match decode_at(raw.id, &raw.payload, raw.received_at) {
            DecodeResult::Decoded(frame) => {
                trace!(id = frame.id, value = ?frame.value, "frame decoded");
                self.writer.record(frame);
                self.diagnostics.record_decoded();
                true
            }
            DecodeResult::UnknownId { id, bytes } => {
                self.diagnostics.record_unknown_id();
                debug!(
                    id = format_args!("0x{id:03X}"),
                    len = bytes.len(),
                    "unknown frame id, skipped"
                );
                false
            }
            DecodeResult::Malformed { id, len } => {
                self.diagnostics.record_malformed();
                debug!(id = format_args!("0x{id:03X}"), len, "malformed frame, skipped");
                false
            }
        }
    }

    fn mark_up(&self) {
        if self.diagnostics.set_status(TransportStatus::Up) == TransportStatus::Unavailable {
            info!("transport recovered");
        }
    }
}

impl<S: FrameSource + Send + 'static> Pipeline<S> {
    /// Run the loop on a dedicated, named thread.
    pub fn spawn(self) -> Result<PipelineHandle> {
        self.spawn_with_shutdown(ShutdownToken::new())
    }

    /// Run the loop on a dedicated thread, observing an existing token.
    pub fn spawn_with_shutdown(self, shutdown: ShutdownToken) -> Result<PipelineHandle> {
        let diagnostics = self.diagnostics();
        let store = self.store();
        let token = shutdown.clone();
        let thread = std::thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || self.run(&token))
            .map_err(PipelineError::Spawn)?;

        Ok(PipelineHandle {
            shutdown,
            diagnostics,
            store,
            thread,
        })
    }
}

/// Handle to an ingestion loop running on its own thread.
pub struct PipelineHandle {
    shutdown: ShutdownToken,
    diagnostics: Arc<Diagnostics>,
    store: TelemetryStore,
    thread: JoinHandle<Result<IngestReport>>,
}

impl PipelineHandle {
    /// Ask the loop to stop after the frame in hand.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop to exit.
    pub fn join(self) -> Result<IngestReport> {
        self.thread.join().map_err(|_| PipelineError::Panicked)?
    }

    /// Request shutdown and wait for the loop to exit.
    pub fn stop(self) -> Result<IngestReport> {
        self.shutdown();
        self.join()
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("cancelled", &self.shutdown.is_cancelled())
            .field("finished", &self.thread.is_finished())
            .field("status", &self.diagnostics.status())
            .finish()
    }
}
