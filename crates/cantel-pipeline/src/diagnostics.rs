use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use serde::Serialize;

/// Transport health as seen by the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TransportStatus {
    /// The loop has not polled the transport yet.
    Starting = 0,
    /// The last poll succeeded (with or without data).
    Up = 1,
    /// The transport reported a transient error; the adapter is recovering.
    Unavailable = 2,
    /// The transport reported it can never deliver again.
    Closed = 3,
    /// The loop exited after a shutdown request or frame limit.
    Stopped = 4,
}

impl TransportStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportStatus::Up,
            2 => TransportStatus::Unavailable,
            3 => TransportStatus::Closed,
            4 => TransportStatus::Stopped,
            _ => TransportStatus::Starting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportStatus::Starting => "starting",
            TransportStatus::Up => "up",
            TransportStatus::Unavailable => "unavailable",
            TransportStatus::Closed => "closed",
            TransportStatus::Stopped => "stopped",
        }
    }
}

/// Lock-free counters written by the ingestion loop and read by consumers.
#[derive(Debug, Default)]
pub struct Diagnostics {
    decoded: AtomicU64,
    unknown_id: AtomicU64,
    malformed: AtomicU64,
    transport_errors: AtomicU64,
    status: AtomicU8,
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub decoded: u64,
    pub unknown_id: u64,
    pub malformed: u64,
    pub transport_errors: u64,
    pub status: TransportStatus,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            decoded: self.decoded.load(Ordering::Relaxed),
            unknown_id: self.unknown_id.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            status: self.status(),
        }
    }

    pub fn status(&self) -> TransportStatus {
        TransportStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Set the status, returning the previous one.
    pub(crate) fn set_status(&self, status: TransportStatus) -> TransportStatus {
        TransportStatus::from_u8(self.status.swap(status as u8, Ordering::AcqRel))
    }

    pub(crate) fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_id(&self) {
        self.unknown_id.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }
}

impl DiagnosticsSnapshot {
    /// Frames that reached the codec.
    pub fn total_frames(&self) -> u64 {
        self.decoded + self.unknown_id + self.malformed
    }

    /// Frames the codec turned away.
    pub fn rejected(&self) -> u64 {
        self.unknown_id + self.malformed
    }

    /// Share of received frames that could not be decoded, in `0.0..=1.0`.
    pub fn error_rate(&self) -> f64 {
        match self.total_frames() {
            0 => 0.0,
            total => self.rejected() as f64 / total as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let diag = Diagnostics::new();
        let snap = diag.snapshot();
        assert_eq!(snap.total_frames(), 0);
        assert_eq!(snap.error_rate(), 0.0);
        assert_eq!(snap.status, TransportStatus::Starting);
    }

    #[test]
    fn counts_and_error_rate() {
        let diag = Diagnostics::new();
        for _ in 0..6 {
            diag.record_decoded();
        }
        diag.record_unknown_id();
        diag.record_malformed();
        diag.record_transport_error();

        let snap = diag.snapshot();
        assert_eq!(snap.decoded, 6);
        assert_eq!(snap.rejected(), 2);
        assert_eq!(snap.total_frames(), 8);
        assert_eq!(snap.transport_errors, 1);
        assert_eq!(snap.error_rate(), 0.25);
    }

    #[test]
    fn status_swap_reports_previous() {
        let diag = Diagnostics::new();
        assert_eq!(diag.set_status(TransportStatus::Up), TransportStatus::Starting);
        assert_eq!(
            diag.set_status(TransportStatus::Unavailable),
            TransportStatus::Up
        );
        assert_eq!(diag.status(), TransportStatus::Unavailable);
    }

    #[test]
    fn snapshot_serializes_with_status_name() {
        let diag = Diagnostics::new();
        diag.set_status(TransportStatus::Unavailable);
        let json = serde_json::to_value(diag.snapshot()).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["decoded"], 0);
    }
}
