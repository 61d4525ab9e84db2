//! Producer threads.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use keyqueue::DispatchQueue;

use crate::config::{DriverConfig, MAX_VOLUME_FACTOR};
use crate::context::RunContext;

/// One producer's assignment: which key it feeds and how many messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer {
    pub id: u32,
    pub key: u32,
    pub volume: u32,
}

/// Assign producers round-robin over the keys with random volumes.
///
/// The config is validated first, so the volume arithmetic cannot overflow.
pub fn plan<R: Rng>(config: &DriverConfig, rng: &mut R) -> anyhow::Result<Vec<Producer>> {
    config.validate()?;
    Ok((0..config.producers)
        .map(|id| Producer {
            id,
            key: id % config.consumers,
            volume: config.volume_multiplier * rng.gen_range(1..=MAX_VOLUME_FACTOR),
        })
        .collect())
}

impl Producer {
    /// Enqueue this producer's messages, pausing a random
    /// `0..=max_sleep_ms` between two of them.
    pub fn run(&self, queue: &DispatchQueue<u32, String>, ctx: &RunContext, max_sleep_ms: u64) {
        let planned = ctx.record_planned(self.volume);
        info!(
            producer = self.id,
            key = self.key,
            volume = self.volume,
            planned,
            "producer started"
        );

        let mut rng = rand::thread_rng();
        for value in 0..self.volume {
            queue.enqueue(
                self.key,
                format!("pid: {}, key: {}, value: {}", self.id, self.key, value),
            );
            let done = ctx.record_enqueued();
            debug!(producer = self.id, done, planned = ctx.planned(), "message enqueued");

            if max_sleep_ms > 0 {
                thread::sleep(Duration::from_millis(rng.gen_range(0..=max_sleep_ms)));
            }
        }
    }
}
