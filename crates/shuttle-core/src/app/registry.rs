//! HandlerRegistry - request type → HandlerEntry
//!
//! dispatcher インスタンスごとに所有する（プロセス全体の状態ではない）。
//! entry は一度作られたら消えない。変わるのは runner と is_draining だけ。

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{JobDescriptor, RequestType, ResultPayload};
use crate::error::ExecutorError;
use crate::observability::EntryStatus;
use crate::ports::Executor;

/// What runs the jobs of one request type.
#[derive(Clone)]
pub(crate) enum Runner {
    /// Executor supplied by the application.
    Registered(Arc<dyn Executor>),

    /// Synthesized for a type nobody registered; always answers with a
    /// "no handler" error payload.
    Fallback,
}

impl Runner {
    pub(crate) async fn run(&self, job: &JobDescriptor) -> Result<ResultPayload, ExecutorError> {
        match self {
            Runner::Registered(executor) => executor.execute(job).await.map(ResultPayload::success),
            Runner::Fallback => Ok(ResultPayload::no_handler(job.request_type())),
        }
    }
}

pub(crate) struct HandlerEntry {
    request_type: RequestType,
    runner: Runner,
    is_draining: bool,
}

impl HandlerEntry {
    fn new(request_type: RequestType, runner: Runner) -> Self {
        Self {
            request_type,
            runner,
            is_draining: false,
        }
    }

    fn status(&self) -> EntryStatus {
        EntryStatus {
            request_type: self.request_type.clone(),
            draining: self.is_draining,
            fallback: matches!(self.runner, Runner::Fallback),
        }
    }
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    entries: HashMap<RequestType, HandlerEntry>,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install or overwrite the runner for `request_type`.
    ///
    /// `is_draining` is left untouched: a loop already draining this type
    /// simply uses the new runner for its next job.
    pub(crate) fn register(&mut self, request_type: RequestType, executor: Arc<dyn Executor>) {
        match self.entries.get_mut(&request_type) {
            Some(entry) => entry.runner = Runner::Registered(executor),
            None => {
                let entry = HandlerEntry::new(request_type.clone(), Runner::Registered(executor));
                self.entries.insert(request_type, entry);
            }
        }
    }

    /// Make sure an entry exists, synthesizing a fallback one if needed.
    ///
    /// Returns `true` when a fallback entry was created.
    pub(crate) fn ensure(&mut self, request_type: &RequestType) -> bool {
        if self.entries.contains_key(request_type) {
            return false;
        }
        self.entries.insert(
            request_type.clone(),
            HandlerEntry::new(request_type.clone(), Runner::Fallback),
        );
        true
    }

    /// Idle → Draining. `false` if a loop already owns this type (or no entry).
    pub(crate) fn try_begin_drain(&mut self, request_type: &RequestType) -> bool {
        match self.entries.get_mut(request_type) {
            Some(entry) if !entry.is_draining => {
                entry.is_draining = true;
                true
            }
            _ => false,
        }
    }

    /// Draining → Idle.
    pub(crate) fn finish_drain(&mut self, request_type: &RequestType) {
        if let Some(entry) = self.entries.get_mut(request_type) {
            entry.is_draining = false;
        }
    }

    /// Runner for the next job, keeping the entry marked as draining.
    pub(crate) fn checkout(&mut self, request_type: &RequestType) -> Option<Runner> {
        let entry = self.entries.get_mut(request_type)?;
        entry.is_draining = true;
        Some(entry.runner.clone())
    }

    #[cfg(test)]
    pub(crate) fn is_draining(&self, request_type: &RequestType) -> bool {
        self.entries
            .get(request_type)
            .is_some_and(|entry| entry.is_draining)
    }

    pub(crate) fn request_types(&self) -> Vec<RequestType> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn registered_types(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| matches!(entry.runner, Runner::Registered(_)))
            .map(|entry| entry.request_type.to_string())
            .collect()
    }

    pub(crate) fn statuses(&self) -> Vec<EntryStatus> {
        let mut statuses: Vec<EntryStatus> = self.entries.values().map(HandlerEntry::status).collect();
        statuses.sort_by(|a, b| a.request_type.cmp(&b.request_type));
        statuses
    }
}
