//! Demo driver for the dispatch queue.
//!
//! Spawns producer threads that enqueue keyed messages while one counting
//! consumer per key tallies deliveries, then reports received vs expected.

pub mod config;
pub mod consumer;
pub mod context;
pub mod producer;
pub mod run;

pub use config::DriverConfig;
pub use consumer::CountingConsumer;
pub use context::RunContext;
pub use producer::{Producer, plan};
pub use run::{ConsumerReport, RunReport, is_settled, run};
