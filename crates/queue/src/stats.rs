//! Delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time snapshot of queue activity.
///
/// The counters are read individually, so a snapshot taken while the worker is
/// mid-pass may be briefly inconsistent (e.g. a message counted as delivered
/// while `pending` still reflects the previous pass).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Messages accepted by `enqueue`.
    pub enqueued: u64,
    /// Messages handed to a consumer (including consumers that panicked).
    pub delivered: u64,
    /// Messages in the pending buffer as of the worker's last pass.
    pub pending: u64,
    /// Messages in the input buffer awaiting the next input pass.
    pub queued_input: u64,
    /// Messages handed back by `take_undelivered`.
    pub withdrawn: u64,
    /// Deliveries whose consumer panicked.
    pub consumer_panics: u64,
    /// Completed passes over the input buffer.
    pub input_passes: u64,
    /// Completed passes over the pending buffer.
    pub pending_passes: u64,
}

impl QueueStats {
    /// Messages enqueued but neither delivered nor withdrawn yet.
    pub fn outstanding(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.delivered)
            .saturating_sub(self.withdrawn)
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    pending: AtomicU64,
    withdrawn: AtomicU64,
    consumer_panics: AtomicU64,
    input_passes: AtomicU64,
    pending_passes: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_consumer_panic(&self) {
        self.consumer_panics.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_withdrawn(&self, count: usize) {
        self.withdrawn.fetch_add(count as u64, Ordering::AcqRel);
    }

    pub(crate) fn record_input_pass(&self) {
        self.input_passes.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_pending_pass(&self) {
        self.pending_passes.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn set_pending(&self, len: usize) {
        self.pending.store(len as u64, Ordering::Release);
    }

    pub(crate) fn snapshot(&self, queued_input: usize) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Acquire),
            delivered: self.delivered.load(Ordering::Acquire),
            pending: self.pending.load(Ordering::Acquire),
            queued_input: queued_input as u64,
            withdrawn: self.withdrawn.load(Ordering::Acquire),
            consumer_panics: self.consumer_panics.load(Ordering::Acquire),
            input_passes: self.input_passes.load(Ordering::Acquire),
            pending_passes: self.pending_passes.load(Ordering::Acquire),
        }
    }
}
