//! Atomic counters exposed by [`Pump::statistics`](crate::pump::Pump::statistics).

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters accumulated over the lifetime of a pump.
///
/// All fields use relaxed ordering: these are diagnostic counters, not
/// synchronization points, and every writer touches a single field at a
/// time so there is nothing for a stronger ordering to protect.
#[derive(Debug, Default)]
pub struct Statistics {
    reads: AtomicU64,
    read_bytes: AtomicU64,
    writes: AtomicU64,
    write_bytes: AtomicU64,
    output_count: AtomicU64,
}

impl Statistics {
    pub(crate) fn record_read(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.read_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, bytes: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.write_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_output(&self) {
        self.output_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of messages successfully read from the transport.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total bytes across all messages read.
    pub fn read_bytes(&self) -> u64 {
        self.read_bytes.load(Ordering::Relaxed)
    }

    /// Number of messages successfully written to the transport.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Total bytes across all messages written.
    pub fn write_bytes(&self) -> u64 {
        self.write_bytes.load(Ordering::Relaxed)
    }

    /// Number of messages accepted onto the write queue, whether or not
    /// they have been written yet.
    pub fn output_count(&self) -> u64 {
        self.output_count.load(Ordering::Relaxed)
    }
}
