use serde::{Deserialize, Serialize};
use std::fmt;

/// Key that partitions jobs and executors into independent queues.
///
/// Free-form string (e.g. `"sum"`, `"echo"`); the dispatcher never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestType(String);

impl RequestType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RequestType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RequestType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RequestType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
