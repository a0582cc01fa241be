use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cantel_codec::DecodedFrame;

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Bounded, time-ordered telemetry history shared between one writer and any
/// number of readers.
///
/// Reads return owned copies; nothing handed out can change afterwards. Every
/// operation holds the lock only for an in-memory copy.
#[derive(Clone)]
pub struct TelemetryStore {
    shared: Arc<Shared>,
}

/// The only handle that can append to a [`TelemetryStore`]. Not cloneable.
pub struct StoreWriter {
    shared: Arc<Shared>,
}

struct Shared {
    config: StoreConfig,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    history: HashMap<u16, VecDeque<DecodedFrame>>,
    events: VecDeque<DecodedFrame>,
    last_value: HashMap<u16, DecodedFrame>,
    total_recorded: u64,
}

impl Shared {
    // Every critical section leaves `Inner` consistent before anything that can
    // panic, so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetryStore {
    /// Build a store and its single writer.
    pub fn new(config: StoreConfig) -> Result<(TelemetryStore, StoreWriter), StoreError> {
        config.validate()?;
        let shared = Arc::new(Shared {
            config,
            inner: Mutex::new(Inner::default()),
        });
        Ok((
            TelemetryStore {
                shared: Arc::clone(&shared),
            },
            StoreWriter { shared },
        ))
    }

    /// History for one identifier, oldest first.
    pub fn snapshot(&self, id: u16) -> Vec<DecodedFrame> {
        let inner = self.shared.lock();
        inner
            .history
            .get(&id)
            .map(|frames| frames.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Most recent frame for one identifier.
    pub fn latest(&self, id: u16) -> Option<DecodedFrame> {
        self.shared.lock().last_value.get(&id).copied()
    }

    /// Most recent frame of every identifier seen so far, in id order.
    pub fn latest_all(&self) -> Vec<DecodedFrame> {
        let mut frames: Vec<DecodedFrame> =
            self.shared.lock().last_value.values().copied().collect();
        frames.sort_by_key(|frame| frame.id);
        frames
    }

    /// The cross-signal event log, oldest first.
    pub fn events(&self) -> Vec<DecodedFrame> {
        self.shared.lock().events.iter().copied().collect()
    }

    /// History entries for `id` received within the last `span`.
    pub fn window(&self, id: u16, span: Duration) -> Vec<DecodedFrame> {
        let cutoff = Instant::now().checked_sub(span);
        let inner = self.shared.lock();
        let Some(frames) = inner.history.get(&id) else {
            return Vec::new();
        };
        match cutoff {
            Some(cutoff) => frames
                .iter()
                .filter(|frame| frame.timestamp >= cutoff)
                .copied()
                .collect(),
            None => frames.iter().copied().collect(),
        }
    }

    /// Number of frames currently held for `id`.
    pub fn len(&self, id: u16) -> usize {
        self.shared
            .lock()
            .history
            .get(&id)
            .map_or(0, VecDeque::len)
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().total_recorded == 0
    }

    /// Frames recorded since creation, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.shared.lock().total_recorded
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }
}

impl StoreWriter {
    /// Append a frame to its history and the event log, and make it the
    /// identifier's current value, as one update.
    pub fn record(&mut self, frame: DecodedFrame) {
        let config = self.shared.config;
        let mut inner = self.shared.lock();

        let history = inner
            .history
            .entry(frame.id)
            .or_default();
        if history.len() == config.history_capacity {
            history.pop_front();
        }
        history.push_back(frame);

        if inner.events.len() == config.event_log_capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(frame);

        inner.last_value.insert(frame.id, frame);
        inner.total_recorded += 1;
    }

    /// A read handle onto the store this writer feeds.
    pub fn store(&self) -> TelemetryStore {
        TelemetryStore {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl std::fmt::Debug for TelemetryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryStore")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for StoreWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreWriter")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}
