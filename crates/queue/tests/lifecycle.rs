//! Start/stop behaviour.

mod common;

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use keyqueue::{DispatchQueue, Lifecycle, QueueConfig, consumer_fn};

use common::{Counter, wait_until};

#[test]
fn lifecycle_walks_through_states() {
    let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
    assert_eq!(queue.lifecycle(), Lifecycle::Created);
    assert!(!queue.is_running());

    queue.start().unwrap();
    assert!(wait_until(|| queue.lifecycle() == Lifecycle::Running));

    queue.stop();
    assert_eq!(queue.lifecycle(), Lifecycle::Stopped);
    assert!(!queue.is_running());
}

#[test]
fn double_start_yields_one_worker() {
    let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
    queue.start().unwrap();
    queue.start().unwrap();

    let consumer = Counter::shared();
    queue.subscribe(0, consumer.clone());
    for n in 0..50 {
        queue.enqueue(0, n);
    }

    assert!(wait_until(|| consumer.received() == 50));
    queue.stop();
    assert_eq!(consumer.received(), 50);
    assert_eq!(queue.stats().delivered, 50);
}

#[test]
fn stop_is_idempotent() {
    let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
    queue.stop();
    assert_eq!(queue.lifecycle(), Lifecycle::Created);

    queue.start().unwrap();
    queue.stop();
    queue.stop();
    assert_eq!(queue.lifecycle(), Lifecycle::Stopped);
}

#[test]
fn stop_right_after_start_is_not_lost() {
    for _ in 0..50 {
        let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
        queue.start().unwrap();
        queue.stop();
        assert_eq!(queue.lifecycle(), Lifecycle::Stopped);
    }
}

#[test]
fn restart_resumes_pending_and_input() {
    let queue: DispatchQueue<u32, &'static str> =
        DispatchQueue::with_config(QueueConfig::default().with_name("restart-test"));
    assert_eq!(queue.name(), "restart-test");

    queue.start().unwrap();
    queue.enqueue(4, "parked");
    assert!(wait_until(|| queue.stats().pending == 1));
    queue.stop();

    // Enqueued while no worker runs; stays in the input buffer.
    queue.enqueue(4, "queued");
    assert_eq!(queue.stats().queued_input, 1);

    let consumer = Counter::shared();
    queue.subscribe(4, consumer.clone());
    assert_eq!(consumer.received(), 0);

    queue.start().unwrap();
    assert!(wait_until(|| consumer.received() == 2));
    queue.stop();
    assert_eq!(queue.stats().outstanding(), 0);
}

#[test]
fn messages_enqueued_before_start_are_taken_in_one_pass() {
    let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
    let consumer = Counter::shared();
    queue.subscribe(1, consumer.clone());

    for n in 0..25 {
        queue.enqueue(1, n);
    }
    queue.start().unwrap();

    assert!(wait_until(|| queue.stats().delivered == 25));
    queue.stop();

    // 25 raises of review-input coalesced into a single pass.
    let stats = queue.stats();
    assert_eq!(stats.input_passes, 1);
    assert_eq!(stats.pending_passes, 1);
}

#[test]
fn take_undelivered_requires_stopped_worker() {
    let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
    queue.start().unwrap();
    queue.enqueue(9, 1);

    let err = queue.take_undelivered().unwrap_err();
    assert!(err.is_worker_running());

    queue.stop();
    let undelivered = queue.take_undelivered().unwrap();
    assert_eq!(undelivered.len(), 1);
    assert_eq!(undelivered[0].clone().into_parts(), (9, 1));
    assert!(queue.take_undelivered().unwrap().is_empty());
}

#[test]
fn consumer_can_stop_its_own_queue() {
    let queue: Arc<DispatchQueue<u32, u32>> = Arc::new(DispatchQueue::new());
    let fired = Arc::new(AtomicBool::new(false));

    let seen = Arc::new(Mutex::new(None));

    let handle = Arc::downgrade(&queue);
    let flag = fired.clone();
    let inside = seen.clone();
    queue.subscribe(
        0,
        Arc::new(consumer_fn(move || {
            if let Some(queue) = handle.upgrade() {
                queue.stop();
                *inside.lock().unwrap() = Some(queue.lifecycle());
            }
            flag.store(true, Ordering::SeqCst);
        })),
    );

    queue.start().unwrap();
    queue.enqueue(0, 1);

    assert!(wait_until(|| fired.load(Ordering::SeqCst)));
    assert_eq!(*seen.lock().unwrap(), Some(Lifecycle::Stopping));
    assert!(wait_until(|| queue.lifecycle() == Lifecycle::Stopped));

    // The self-stopped worker is reaped and replaced.
    queue.start().unwrap();
    assert!(wait_until(|| queue.is_running()));
    queue.stop();
    assert_eq!(queue.lifecycle(), Lifecycle::Stopped);
}

#[test]
fn consumer_can_withdraw_its_own_stop() {
    let queue: Arc<DispatchQueue<u32, u32>> = Arc::new(DispatchQueue::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handle = Arc::downgrade(&queue);
    let inside = seen.clone();
    queue.subscribe(
        0,
        Arc::new(consumer_fn(move || {
            if let Some(queue) = handle.upgrade() {
                queue.stop();
                inside.lock().unwrap().push(queue.lifecycle());
                queue.start().unwrap();
                inside.lock().unwrap().push(queue.lifecycle());
            }
        })),
    );
    let counter = Counter::shared();
    queue.subscribe(1, counter.clone());

    queue.start().unwrap();
    queue.enqueue(0, 1);
    assert!(wait_until(|| seen.lock().unwrap().len() == 2));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Lifecycle::Stopping, Lifecycle::Running]
    );

    // The same worker keeps dispatching.
    queue.enqueue(1, 2);
    assert!(wait_until(|| counter.received() == 1));
    assert_eq!(queue.lifecycle(), Lifecycle::Running);
    queue.stop();
    assert_eq!(queue.lifecycle(), Lifecycle::Stopped);
}

/// Key whose `Hash` panics once `explode` is set.
#[derive(Debug, Clone)]
struct Fragile {
    id: u32,
    explode: Arc<AtomicBool>,
}

impl PartialEq for Fragile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Fragile {}

impl Hash for Fragile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.explode.load(Ordering::SeqCst) {
            panic!("key {} refused to hash", self.id);
        }
        self.id.hash(state);
    }
}

#[test]
fn worker_panic_outside_consumer_parks_pending_messages() {
    let explode = Arc::new(AtomicBool::new(false));
    let key = |id| Fragile {
        id,
        explode: explode.clone(),
    };

    let queue: DispatchQueue<Fragile, u32> = DispatchQueue::new();
    // Lookups only hash the key once the table is non-empty.
    queue.subscribe(key(1), Counter::shared());
    queue.start().unwrap();

    queue.enqueue(key(2), 10);
    queue.enqueue(key(2), 11);
    assert!(wait_until(|| queue.stats().pending == 2));

    explode.store(true, Ordering::SeqCst);
    queue.enqueue(key(3), 12);
    assert!(wait_until(|| queue.lifecycle() == Lifecycle::Stopped));
    queue.stop();
    explode.store(false, Ordering::SeqCst);

    let stats = queue.stats();
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.outstanding(), 3);

    let undelivered: Vec<(u32, u32)> = queue
        .take_undelivered()
        .unwrap()
        .into_iter()
        .map(|message| {
            let (key, value) = message.into_parts();
            (key.id, value)
        })
        .collect();
    assert_eq!(undelivered, vec![(2, 10), (2, 11), (3, 12)]);
}

#[test]
fn dropping_the_queue_stops_the_worker() {
    let consumer = Counter::shared();
    {
        let queue: DispatchQueue<u32, u32> = DispatchQueue::new();
        queue.subscribe(0, consumer.clone());
        queue.start().unwrap();
        queue.enqueue(0, 1);
        assert!(wait_until(|| consumer.received() == 1));
    }

    // The worker dropped its lease on the consumer when it exited.
    assert_eq!(Arc::strong_count(&consumer), 1);
}
