//! Notifications exchanged between the server and the dispatcher.
//!
//! - arrival: server → dispatcher, payload は RequestType だけ
//! - completion: dispatcher → server, [`JobDone`]

use serde::{Deserialize, Serialize};

use super::{JobDescriptor, JobId, ResultPayload};

/// Completion notification: the original descriptor paired with its result.
///
/// The server correlates it back to the client through `descriptor.id()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDone {
    pub descriptor: JobDescriptor,
    pub result: ResultPayload,
}

impl JobDone {
    pub fn new(descriptor: JobDescriptor, result: ResultPayload) -> Self {
        Self { descriptor, result }
    }

    pub fn job_id(&self) -> JobId {
        self.descriptor.id()
    }
}
