use std::sync::atomic::{AtomicU32, Ordering};

use keyqueue::Consumer;

/// Consumer that counts deliveries against an expected total.
#[derive(Debug, Default)]
pub struct CountingConsumer {
    expected: AtomicU32,
    received: AtomicU32,
}

impl CountingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` to the number of messages this consumer should see.
    pub fn expect(&self, count: u32) {
        self.expected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn expected(&self) -> u32 {
        self.expected.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u32 {
        self.received.load(Ordering::Relaxed)
    }
}

impl Consumer for CountingConsumer {
    fn consume(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }
}
