//! A full driver run.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use keyqueue::{DispatchQueue, QueueConfig, QueueStats};

use crate::config::DriverConfig;
use crate::consumer::CountingConsumer;
use crate::context::RunContext;
use crate::producer::plan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerReport {
    pub key: u32,
    pub expected: u32,
    pub received: u32,
}

/// Outcome of a driver run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: DriverConfig,
    pub enqueued: u64,
    /// Whether deliveries settled (delivered or pending) before the drain timeout.
    pub drained: bool,
    pub consumers: Vec<ConsumerReport>,
    pub stats: QueueStats,
}

impl RunReport {
    /// Every consumer received exactly what its producers sent.
    pub fn is_complete(&self) -> bool {
        self.consumers.iter().all(|c| c.received == c.expected)
    }
}

/// Start a queue, subscribe one counting consumer per key, run all producers
/// to completion, wait for delivery, then tear down and report.
pub fn run(config: &DriverConfig) -> anyhow::Result<RunReport> {
    config.validate()?;

    let queue: DispatchQueue<u32, String> =
        DispatchQueue::with_config(QueueConfig::default().with_name("keyqueue-driver"));
    queue.start().context("starting dispatch queue")?;

    let consumers: Vec<Arc<CountingConsumer>> = (0..config.consumers)
        .map(|_| Arc::new(CountingConsumer::new()))
        .collect();
    for (key, consumer) in (0u32..).zip(&consumers) {
        queue.subscribe(key, consumer.clone());
    }

    let producers = plan(config, &mut rand::thread_rng())?;
    for producer in &producers {
        consumers[producer.key as usize].expect(producer.volume);
    }

    let ctx = RunContext::new();
    thread::scope(|scope| -> anyhow::Result<()> {
        for producer in &producers {
            let (queue, ctx) = (&queue, &ctx);
            thread::Builder::new()
                .name(format!("producer-{}", producer.id))
                .spawn_scoped(scope, move || producer.run(queue, ctx, config.max_sleep_ms))
                .with_context(|| format!("spawning producer {}", producer.id))?;
        }
        Ok(())
    })?;

    let enqueued = ctx.enqueued();
    let drained = wait_until_settled(
        &queue,
        enqueued,
        Duration::from_millis(config.drain_timeout_ms),
    );
    if !drained {
        let stats = queue.stats();
        warn!(
            enqueued,
            delivered = stats.delivered,
            pending = stats.pending,
            "drain timeout elapsed before deliveries settled"
        );
    }

    for key in 0..config.consumers {
        queue.unsubscribe(&key);
    }
    queue.stop();

    let report = RunReport {
        config: config.clone(),
        enqueued,
        drained,
        consumers: (0u32..)
            .zip(&consumers)
            .map(|(key, c)| ConsumerReport {
                key,
                expected: c.expected(),
                received: c.received(),
            })
            .collect(),
        stats: queue.stats(),
    };
    info!(
        enqueued,
        delivered = report.stats.delivered,
        complete = report.is_complete(),
        "driver run finished"
    );
    Ok(report)
}

/// Deliveries have settled: every enqueued message was either delivered or
/// parked as pending, and nothing is waiting in the input buffer.
pub fn is_settled(stats: &QueueStats, enqueued: u64) -> bool {
    stats.queued_input == 0 && stats.delivered + stats.pending == enqueued
}

fn wait_until_settled(queue: &DispatchQueue<u32, String>, enqueued: u64, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if is_settled(&queue.stats(), enqueued) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_counts_pending_messages() {
        let stats = QueueStats {
            enqueued: 10,
            delivered: 7,
            pending: 3,
            ..QueueStats::default()
        };
        assert!(is_settled(&stats, 10));
    }

    #[test]
    fn not_settled_while_input_is_queued_or_in_flight() {
        let queued = QueueStats {
            delivered: 7,
            pending: 3,
            queued_input: 1,
            ..QueueStats::default()
        };
        assert!(!is_settled(&queued, 10));

        let in_flight = QueueStats {
            delivered: 5,
            pending: 3,
            ..QueueStats::default()
        };
        assert!(!is_settled(&in_flight, 10));
    }
}
