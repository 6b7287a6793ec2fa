//! Result payload: what a completion notification carries back to the server.
//!
//! An executor produces the success side. The error side is synthesized by
//! the dispatcher itself (no handler for a type, or a job it could not
//! process) and travels through the same completion channel.

use serde::{Deserialize, Serialize};

use super::RequestType;

/// Tagged result of one job.
///
/// Serialized with a `status` tag:
/// `{"status":"success","value":5}` / `{"status":"error","type":"echo","err":"no handler for echo"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultPayload {
    Success {
        value: serde_json::Value,
    },
    Error {
        #[serde(rename = "type")]
        request_type: RequestType,
        err: String,
    },
}

impl ResultPayload {
    pub fn success(value: serde_json::Value) -> Self {
        Self::Success { value }
    }

    /// Payload returned by the fallback runner of an unregistered type.
    pub fn no_handler(request_type: &RequestType) -> Self {
        Self::Error {
            request_type: request_type.clone(),
            err: format!("no handler for {request_type}"),
        }
    }

    /// Payload for a job the dispatcher had to give up on without retry.
    pub fn could_not_process(request_type: &RequestType) -> Self {
        Self::Error {
            request_type: request_type.clone(),
            err: format!("could not process {request_type}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { value } => Some(value),
            Self::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Error { err, .. } => Some(err),
        }
    }
}
