#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use keyqueue::Consumer;

/// Counts deliveries.
#[derive(Debug, Default)]
pub struct Counter {
    received: AtomicU32,
}

impl Counter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn received(&self) -> u32 {
        self.received.load(Ordering::SeqCst)
    }
}

impl Consumer for Counter {
    fn consume(&self) {
        self.received.fetch_add(1, Ordering::SeqCst);
    }
}

/// Appends its key to a shared log on every delivery.
#[derive(Debug)]
pub struct Recorder<K> {
    key: K,
    log: Arc<Mutex<Vec<K>>>,
}

impl<K: Clone> Recorder<K> {
    pub fn new(key: K, log: Arc<Mutex<Vec<K>>>) -> Arc<Self> {
        Arc::new(Self { key, log })
    }
}

impl<K> Consumer for Recorder<K>
where
    K: Clone + Send + Sync,
{
    fn consume(&self) {
        self.log.lock().unwrap().push(self.key.clone());
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
