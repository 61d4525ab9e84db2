//! `keyqueue`: in-process, key-addressed message dispatch.
//!
//! Producers [`enqueue`](DispatchQueue::enqueue) `(key, value)` messages,
//! consumers [`subscribe`](DispatchQueue::subscribe) to a key, and a single
//! background worker delivers each message to the consumer currently
//! registered for its key.
//!
//! ```text
//! enqueue ──► input buffer ──(swap)──► worker ──► Consumer::consume()
//!                                        │
//!                                        └─ no subscriber ──► pending buffer
//!                                                               ▲
//!                    subscribe ──(review-pending signal)────────┘
//! ```
//!
//! Messages with no subscriber are never dropped; they wait in the pending
//! buffer until a consumer for their key shows up.

pub mod config;
pub mod consumer;
pub mod lifecycle;
pub mod message;
pub mod queue;
pub mod signal;
pub mod stats;
pub mod subscription;

mod sync;
mod worker;

pub use config::QueueConfig;
pub use consumer::{Consumer, FnConsumer, consumer_fn};
pub use lifecycle::Lifecycle;
pub use message::Message;
pub use queue::DispatchQueue;
pub use signal::{Signal, SignalSet, WorkerState};
pub use stats::QueueStats;
pub use subscription::SubscriptionTable;

pub use keyqueue_core::{MessageId, QueueError, QueueResult};
