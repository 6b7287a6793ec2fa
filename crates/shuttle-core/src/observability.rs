use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::RequestType;

/// Snapshot of one handler entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    pub request_type: RequestType,
    pub draining: bool,
    /// The runner is the synthesized "no handler" one.
    pub fallback: bool,
}

/// Counters since the dispatcher was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub arrivals: u64,
    pub drains_started: u64,
    pub succeeded: u64,
    pub retried: u64,
    pub synthesized_errors: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    arrivals: AtomicU64,
    drains_started: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    synthesized_errors: AtomicU64,
}

impl Counters {
    pub(crate) fn arrival(&self) {
        self.arrivals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn drain_started(&self) {
        self.drains_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn synthesized_error(&self) {
        self.synthesized_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            arrivals: self.arrivals.load(Ordering::Relaxed),
            drains_started: self.drains_started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            synthesized_errors: self.synthesized_errors.load(Ordering::Relaxed),
        }
    }
}
