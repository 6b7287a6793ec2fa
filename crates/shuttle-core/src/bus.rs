//! In-process notification bus between the server and the dispatcher.
//!
//! Two `tokio::sync::broadcast` channels:
//! - **arrivals**: server announces "a job of type T was queued"
//! - **completions**: dispatcher publishes [`JobDone`] for every finished job
//!
//! Cheap to clone; every clone publishes into the same channels.

use tokio::sync::broadcast;

use crate::domain::{JobDone, RequestType};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct NotificationBus {
    arrivals: broadcast::Sender<RequestType>,
    completions: broadcast::Sender<JobDone>,
}

impl NotificationBus {
    /// Create a bus with a specific per-channel capacity.
    ///
    /// A receiver that falls more than `capacity` messages behind observes
    /// `RecvError::Lagged` and loses the oldest messages.
    pub fn new(capacity: usize) -> Self {
        let (arrivals, _) = broadcast::channel(capacity);
        let (completions, _) = broadcast::channel(capacity);
        Self {
            arrivals,
            completions,
        }
    }

    /// Server side: a job of `request_type` was queued.
    pub fn announce(&self, request_type: RequestType) {
        if self.arrivals.send(request_type).is_err() {
            tracing::debug!("arrival published with no subscribers");
        }
    }

    /// Dispatcher side: a job finished.
    pub fn complete(&self, done: JobDone) {
        if let Err(broadcast::error::SendError(done)) = self.completions.send(done) {
            tracing::warn!(
                job_id = %done.job_id(),
                request_type = %done.descriptor.request_type(),
                "completion published with no subscribers; result dropped",
            );
        }
    }

    pub fn subscribe_arrivals(&self) -> broadcast::Receiver<RequestType> {
        self.arrivals.subscribe()
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<JobDone> {
        self.completions.subscribe()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
