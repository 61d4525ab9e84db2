//! Engine lifecycle states.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of a [`DispatchQueue`](crate::DispatchQueue).
///
/// `Created → Started → Running → Stopping → Stopped`, and back to
/// `Started` on a later `start()`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Never started.
    Created,
    /// Worker thread spawned but not yet in its loop.
    Started,
    /// Worker is looping (idle or dispatching).
    Running,
    /// `stop()` is waiting for the worker to exit.
    Stopping,
    /// No worker is running.
    Stopped,
}

impl Lifecycle {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Lifecycle::Created,
            1 => Lifecycle::Started,
            2 => Lifecycle::Running,
            3 => Lifecycle::Stopping,
            _ => Lifecycle::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Lifecycle::Created => 0,
            Lifecycle::Started => 1,
            Lifecycle::Running => 2,
            Lifecycle::Stopping => 3,
            Lifecycle::Stopped => 4,
        }
    }
}

/// Lock-free lifecycle holder, readable from any thread (including consumers
/// running on the worker).
#[derive(Debug)]
pub(crate) struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Lifecycle::Created.as_u8()))
    }

    pub(crate) fn get(&self) -> Lifecycle {
        Lifecycle::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: Lifecycle) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    /// Move to `to` only if currently in `from`.
    pub(crate) fn transition(&self, from: Lifecycle, to: Lifecycle) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn replace(&self, state: Lifecycle) -> Lifecycle {
        Lifecycle::from_u8(self.0.swap(state.as_u8(), Ordering::AcqRel))
    }
}
