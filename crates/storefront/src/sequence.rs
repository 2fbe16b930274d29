//! Stale-response filtering for request streams.
//!
//! Each logical stream of requests (the search panel, for one) keeps a
//! [`SequenceTracker`]. Every dispatch takes a [`Ticket`]; when the
//! response arrives it may only be applied if its ticket is still the
//! latest one issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket dispenser for one request stream.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    latest: AtomicU64,
}

/// Position of one dispatch within its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw sequence number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl SequenceTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Issue the next ticket; it supersedes every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is still the most recently issued one.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Latest issued ticket, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Ticket> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            n => Some(Ticket(n)),
        }
    }
}
