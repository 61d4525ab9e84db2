//! The dispatch queue engine and its public API.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{error, info, trace};

use keyqueue_core::{MessageId, QueueError, QueueResult};

use crate::config::QueueConfig;
use crate::consumer::Consumer;
use crate::lifecycle::{Lifecycle, LifecycleCell};
use crate::message::Message;
use crate::signal::{Signal, SignalSet};
use crate::stats::{QueueStats, StatsCounters};
use crate::subscription::SubscriptionTable;
use crate::sync::lock;
use crate::worker;

/// State shared between the public handle and the worker thread.
///
/// The signal set, the input buffer and the subscription table each have
/// their own lock and none is ever taken while holding another.
pub(crate) struct Shared<K, V> {
    pub(crate) name: String,
    pub(crate) signals: Mutex<SignalSet>,
    pub(crate) wake: Condvar,
    pub(crate) input: Mutex<VecDeque<Message<K, V>>>,
    /// Pending buffer while no worker owns it.
    pub(crate) parked: Mutex<VecDeque<Message<K, V>>>,
    pub(crate) subscriptions: SubscriptionTable<K>,
    pub(crate) stats: StatsCounters,
    pub(crate) lifecycle: LifecycleCell,
    pub(crate) worker_thread: Mutex<Option<ThreadId>>,
    /// An external `stop()` is waiting on the worker; only touched under `signals`.
    joining: AtomicBool,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash,
{
    fn new(config: QueueConfig) -> Self {
        Self {
            name: config.name,
            signals: Mutex::new(SignalSet::new()),
            wake: Condvar::new(),
            input: Mutex::new(VecDeque::new()),
            parked: Mutex::new(VecDeque::new()),
            subscriptions: SubscriptionTable::new(),
            stats: StatsCounters::default(),
            lifecycle: LifecycleCell::new(),
            worker_thread: Mutex::new(None),
            joining: AtomicBool::new(false),
        }
    }
}

impl<K, V> Shared<K, V> {
    pub(crate) fn raise(&self, signal: Signal) {
        let mut signals = lock(&self.signals);
        signals.raise(signal);
        self.wake.notify_one();
    }

    fn is_worker_thread(&self) -> bool {
        *lock(&self.worker_thread) == Some(thread::current().id())
    }
}

/// In-process, key-addressed dispatch queue with one background worker.
///
/// All methods take `&self`; share the queue between producer threads with
/// `Arc` or scoped threads. Dropping the queue stops the worker.
///
/// ## Delivery
///
/// - Each message is handed to at most one consumer, at most once.
/// - Messages for a key with no subscriber wait in the pending buffer with no
///   expiry; a later [`subscribe`](Self::subscribe) for that key delivers them.
/// - Within one worker pass over a buffer, messages are dispatched in
///   insertion order. Nothing is guaranteed across passes or across keys.
///
/// ## Unsubscribe race
///
/// The worker clones the consumer handle under the table lock and calls it
/// after releasing the lock. A consumer is therefore never freed mid-call, but
/// `unsubscribe` does not wait for an in-flight dispatch: one delivery to a
/// consumer that was unsubscribed a moment earlier is possible.
pub struct DispatchQueue<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + 'static,
{
    shared: Arc<Shared<K, V>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> DispatchQueue<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + 'static,
{
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
            worker: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Append a message to the input buffer and wake the worker.
    ///
    /// Never waits for consumption; only contends briefly with other producers
    /// and with the worker's buffer swap.
    pub fn enqueue(&self, key: K, value: V) -> MessageId {
        let message = Message::new(key, value);
        let id = message.id();

        // Count before the push so `delivered` can never overtake `enqueued`.
        self.shared.stats.record_enqueued();
        lock(&self.shared.input).push_back(message);
        self.shared.raise(Signal::ReviewInput);
        id
    }

    /// Like [`enqueue`](Self::enqueue), for callers that keep their key and value.
    pub fn enqueue_cloned(&self, key: &K, value: &V) -> MessageId
    where
        K: Clone,
        V: Clone,
    {
        self.enqueue(key.clone(), value.clone())
    }

    /// Register `consumer` for `key`, replacing any earlier registration, and
    /// ask the worker to retry pending messages.
    pub fn subscribe(&self, key: K, consumer: Arc<dyn Consumer>) {
        let replaced = self.shared.subscriptions.insert(key, consumer);
        trace!(
            queue = %self.shared.name,
            replaced = replaced.is_some(),
            "consumer subscribed"
        );
        self.shared.raise(Signal::ReviewPending);
    }

    /// Remove the registration for `key`. Returns `false` if there was none.
    ///
    /// Pending messages are not re-scanned: removing a consumer creates no
    /// deliverable work.
    pub fn unsubscribe(&self, key: &K) -> bool {
        let removed = self.shared.subscriptions.remove(key).is_some();
        trace!(queue = %self.shared.name, removed, "consumer unsubscribed");
        removed
    }

    pub fn is_subscribed(&self, key: &K) -> bool {
        self.shared.subscriptions.contains(key)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriptions.len()
    }

    /// Spawn the worker. Does nothing if one is already running.
    ///
    /// Both review signals are raised before the worker starts, so messages
    /// left over from an earlier run are looked at again.
    pub fn start(&self) -> QueueResult<()> {
        if self.shared.is_worker_thread() {
            // Called from a consumer: the worker has not re-checked its
            // signals yet, so withdrawing a stop request keeps it running.
            // A stop() already waiting on another thread is left alone.
            let mut signals = lock(&self.shared.signals);
            if !self.shared.joining.load(Ordering::Acquire) && signals.take(Signal::Stop) {
                self.shared.lifecycle.set(Lifecycle::Running);
            }
            return Ok(());
        }

        let mut slot = lock(&self.worker);
        if let Some(handle) = slot.take() {
            let stop_raised = lock(&self.shared.signals).is_raised(Signal::Stop);
            if !stop_raised && !handle.is_finished() {
                *slot = Some(handle);
                return Ok(());
            }
            // Stopped from inside a consumer (or died); reap it first.
            self.join(handle);
        }

        {
            let mut signals = lock(&self.shared.signals);
            signals.take(Signal::Stop);
            signals.raise(Signal::ReviewPending);
            signals.raise(Signal::ReviewInput);
        }

        let previous = self.shared.lifecycle.replace(Lifecycle::Started);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || worker::run(shared));

        match spawned {
            Ok(handle) => {
                info!(queue = %self.shared.name, "dispatch worker spawned");
                *slot = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.lifecycle.set(previous);
                Err(QueueError::WorkerSpawn(err))
            }
        }
    }

    /// Ask the worker to exit and wait until it has.
    ///
    /// Cooperative: the worker finishes its current pass first, and buffers
    /// are not drained. A no-op when no worker is running. Called from a
    /// consumer, it only raises the stop signal and returns; the worker exits
    /// once that consumer returns and its pass completes.
    pub fn stop(&self) {
        if self.shared.is_worker_thread() {
            let mut signals = lock(&self.shared.signals);
            self.shared.lifecycle.set(Lifecycle::Stopping);
            signals.raise(Signal::Stop);
            return;
        }

        let mut slot = lock(&self.worker);
        let Some(handle) = slot.take() else {
            return;
        };

        {
            let mut signals = lock(&self.shared.signals);
            self.shared.joining.store(true, Ordering::Release);
            self.shared.lifecycle.set(Lifecycle::Stopping);
            signals.raise(Signal::Stop);
            self.shared.wake.notify_one();
        }
        self.join(handle);
        self.shared.joining.store(false, Ordering::Release);
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle.get()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Started | Lifecycle::Running)
    }

    pub fn stats(&self) -> QueueStats {
        let queued_input = lock(&self.shared.input).len();
        self.shared.stats.snapshot(queued_input)
    }

    /// Hand back every undelivered message (pending first, then input).
    ///
    /// Only allowed while no worker is running; messages withdrawn this way
    /// are no longer counted as outstanding.
    pub fn take_undelivered(&self) -> QueueResult<Vec<Message<K, V>>> {
        if self.shared.is_worker_thread() {
            return Err(QueueError::WorkerRunning);
        }

        let mut slot = lock(&self.worker);
        if let Some(handle) = slot.take() {
            if !handle.is_finished() {
                *slot = Some(handle);
                return Err(QueueError::WorkerRunning);
            }
            self.join(handle);
        }

        let mut undelivered: Vec<Message<K, V>> = lock(&self.shared.parked).drain(..).collect();
        undelivered.extend(lock(&self.shared.input).drain(..));

        self.shared.stats.set_pending(0);
        self.shared.stats.record_withdrawn(undelivered.len());
        Ok(undelivered)
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            error!(
                queue = %self.shared.name,
                "dispatch worker panicked; undelivered messages were parked"
            );
        }
        self.shared.lifecycle.set(Lifecycle::Stopped);
    }
}

impl<K, V> Default for DispatchQueue<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for DispatchQueue<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<K, V> core::fmt::Debug for DispatchQueue<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + 'static,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("name", &self.shared.name)
            .field("lifecycle", &self.lifecycle())
            .field("subscriptions", &self.shared.subscriptions)
            .finish()
    }
}
