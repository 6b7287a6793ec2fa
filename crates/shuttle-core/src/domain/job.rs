//! Queued job descriptor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobId, RequestType};

/// One pending client request of a given type.
///
/// Owned by the server. The dispatcher only moves it around: it is popped
/// from the head of its type's queue, handed to an executor, and either
/// completed or pushed back to the tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    id: JobId,
    request_type: RequestType,
    payload: serde_json::Value,
    enqueued_at: DateTime<Utc>,

    /// Failed executions so far.
    #[serde(default)]
    attempts: u32,
}

impl JobDescriptor {
    pub fn new(request_type: RequestType, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::generate(),
            request_type,
            payload,
            enqueued_at: Utc::now(),
            attempts: 0,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn request_type(&self) -> &RequestType {
        &self.request_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record one failed execution before the descriptor goes back to the queue.
    pub(crate) fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}
