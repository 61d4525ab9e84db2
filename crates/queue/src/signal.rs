//! Worker wakeup signals.
//!
//! Signals are level-triggered: each one names a category of outstanding
//! work, not an event count. Raising a signal that is already raised is a
//! no-op, so any number of raises before the worker takes the signal collapse
//! into a single pass. Callers cannot infer how many enqueues happened from
//! how many passes the worker made.

/// A category of work the worker is asked to perform.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Exit the worker loop. Takes priority over everything else.
    Stop,
    /// Re-scan the pending buffer (a subscription changed).
    ReviewPending,
    /// Drain the input buffer (new messages were enqueued).
    ReviewInput,
}

impl Signal {
    const fn bit(self) -> u8 {
        match self {
            Signal::Stop => 1 << 0,
            Signal::ReviewPending => 1 << 1,
            Signal::ReviewInput => 1 << 2,
        }
    }
}

/// What the worker does next, derived from the raised signals.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    ReviewPending,
    ReviewInput,
    Stopped,
}

/// The set of currently raised signals.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SignalSet {
    bits: u8,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `signal`. Returns `false` if it was already raised (coalesced).
    pub fn raise(&mut self, signal: Signal) -> bool {
        let was_raised = self.is_raised(signal);
        self.bits |= signal.bit();
        !was_raised
    }

    /// Clear `signal`, returning whether it was raised.
    pub fn take(&mut self, signal: Signal) -> bool {
        let was_raised = self.is_raised(signal);
        self.bits &= !signal.bit();
        was_raised
    }

    pub fn is_raised(&self, signal: Signal) -> bool {
        self.bits & signal.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Stop wins over pending review, which wins over input review.
    pub fn next_state(&self) -> WorkerState {
        if self.is_raised(Signal::Stop) {
            WorkerState::Stopped
        } else if self.is_raised(Signal::ReviewPending) {
            WorkerState::ReviewPending
        } else if self.is_raised(Signal::ReviewInput) {
            WorkerState::ReviewInput
        } else {
            WorkerState::Idle
        }
    }
}
