//! `keyqueue-core`: shared building blocks for the dispatch queue.
//!
//! This crate holds the error model and identifiers; it has no threads and no IO.

pub mod error;
pub mod id;

pub use error::{QueueError, QueueResult};
pub use id::MessageId;
