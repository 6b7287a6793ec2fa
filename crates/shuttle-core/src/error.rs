use thiserror::Error;

use crate::domain::RequestType;

/// An executor could not produce a result for a job.
///
/// The dispatcher never forwards this to the server; it requeues the job.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecutorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure talking to the server's job storage.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("job source unavailable: {0}")]
    Unavailable(String),

    #[error("requeue rejected for request_type={0}: {1}")]
    RequeueRejected(RequestType, String),
}

/// Invalid value in the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Dispatcher construction failed the startup check.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing executors for request types: {0:?}. These types were expected but not registered.")]
    MissingRequestTypes(Vec<String>),
}

#[derive(Debug, Error)]
pub enum ShuttleError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}
