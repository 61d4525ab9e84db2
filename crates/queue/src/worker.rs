//! The dispatch worker loop.

use std::collections::VecDeque;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::lifecycle::Lifecycle;
use crate::message::Message;
use crate::queue::Shared;
use crate::signal::{Signal, WorkerState};
use crate::sync::{lock, wait};

/// Worker thread body.
pub(crate) fn run<K, V>(shared: Arc<Shared<K, V>>)
where
    K: Eq + Hash,
{
    *lock(&shared.worker_thread) = Some(thread::current().id());
    let mut buffers = Buffers::pick_up(&shared);
    shared.lifecycle.transition(Lifecycle::Started, Lifecycle::Running);
    info!(
        queue = %shared.name,
        pending = buffers.pending.len(),
        "dispatch worker running"
    );

    let mut signals = lock(&shared.signals);
    loop {
        match signals.next_state() {
            WorkerState::Stopped => break,
            WorkerState::ReviewPending => {
                signals.take(Signal::ReviewPending);
                drop(signals);
                buffers.review_pending();
                signals = lock(&shared.signals);
            }
            WorkerState::ReviewInput => {
                signals.take(Signal::ReviewInput);
                drop(signals);
                buffers.review_input();
                signals = lock(&shared.signals);
            }
            WorkerState::Idle => {
                signals = wait(&shared.wake, signals);
            }
        }
    }
    drop(signals);
    drop(buffers);
    info!(queue = %shared.name, "dispatch worker stopped");
}

/// Messages owned by the worker thread.
///
/// `pending` is picked up from `parked` on entry. Dropping `Buffers` (normal
/// exit or unwinding) parks every message it still holds so a later worker
/// carries on with them. During a pass, messages not yet examined sit in
/// `scan` and examined-but-undelivered ones in `kept`; a message leaves both
/// only once its consumer has been invoked.
struct Buffers<'a, K, V> {
    shared: &'a Shared<K, V>,
    pending: VecDeque<Message<K, V>>,
    scan: VecDeque<Message<K, V>>,
    kept: VecDeque<Message<K, V>>,
}

impl<'a, K, V> Buffers<'a, K, V>
where
    K: Eq + Hash,
{
    fn pick_up(shared: &'a Shared<K, V>) -> Self {
        Self {
            shared,
            pending: std::mem::take(&mut *lock(&shared.parked)),
            scan: VecDeque::new(),
            kept: VecDeque::new(),
        }
    }

    /// Retry every pending message, front to back.
    fn review_pending(&mut self) {
        self.scan = std::mem::take(&mut self.pending);
        let delivered = self.sweep();
        self.pending = std::mem::take(&mut self.kept);

        let stats = &self.shared.stats;
        stats.set_pending(self.pending.len());
        stats.record_pending_pass();
        debug!(
            queue = %self.shared.name,
            delivered,
            pending = self.pending.len(),
            oldest_pending = ?self.pending.front().map(Message::enqueued_at),
            "pending pass complete"
        );
    }

    /// Swap out the input buffer and dispatch the captured batch; whatever is
    /// left joins the back of the pending buffer.
    fn review_input(&mut self) {
        self.scan = std::mem::take(&mut *lock(&self.shared.input));
        let captured = self.scan.len();
        self.sweep();
        let deferred = self.kept.len();
        self.pending.append(&mut self.kept);

        let stats = &self.shared.stats;
        stats.set_pending(self.pending.len());
        stats.record_input_pass();
        debug!(
            queue = %self.shared.name,
            captured,
            deferred,
            pending = self.pending.len(),
            oldest_pending = ?self.pending.front().map(Message::enqueued_at),
            "input pass complete"
        );
    }

    /// Dispatch everything in `scan` in order, moving undelivered messages to
    /// `kept`. Returns the number delivered.
    fn sweep(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(message) = self.scan.front() {
            if dispatch(self.shared, message) {
                self.scan.pop_front();
                delivered += 1;
            } else if let Some(message) = self.scan.pop_front() {
                self.kept.push_back(message);
            }
        }
        delivered
    }
}

impl<K, V> Drop for Buffers<'_, K, V> {
    fn drop(&mut self) {
        let mut parked = std::mem::take(&mut self.pending);
        parked.append(&mut self.kept);
        parked.append(&mut self.scan);
        let remaining = parked.len();

        *lock(&self.shared.parked) = parked;
        self.shared.stats.set_pending(remaining);
        *lock(&self.shared.worker_thread) = None;
        self.shared.lifecycle.set(Lifecycle::Stopped);

        if thread::panicking() {
            warn!(
                queue = %self.shared.name,
                parked = remaining,
                "dispatch worker unwinding; undelivered messages parked"
            );
        }
    }
}

/// Deliver `message` if its key has a subscriber. Returns whether it was
/// delivered.
fn dispatch<K, V>(shared: &Shared<K, V>, message: &Message<K, V>) -> bool
where
    K: Eq + Hash,
{
    // The lease is taken under the table lock; the call happens outside it.
    let Some(consumer) = shared.subscriptions.lookup(message.key()) else {
        return false;
    };

    if catch_unwind(AssertUnwindSafe(|| consumer.consume())).is_err() {
        shared.stats.record_consumer_panic();
        warn!(
            queue = %shared.name,
            message_id = %message.id(),
            enqueued_at = %message.enqueued_at(),
            "consumer panicked; message counted as delivered"
        );
    }

    shared.stats.record_delivered();
    true
}
