use std::sync::atomic::{AtomicU64, Ordering};

/// Progress counters for one driver run, shared by reference with every
/// producer thread.
#[derive(Debug, Default)]
pub struct RunContext {
    planned: AtomicU64,
    enqueued: AtomicU64,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A producer announces its volume; returns the new planned total.
    pub fn record_planned(&self, volume: u32) -> u64 {
        self.planned.fetch_add(u64::from(volume), Ordering::Relaxed) + u64::from(volume)
    }

    /// Returns the running enqueue count including this one.
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn planned(&self) -> u64 {
        self.planned.load(Ordering::Relaxed)
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }
}
