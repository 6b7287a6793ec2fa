//! InMemoryServer - 開発・テスト用のサーバ実装
//!
//! - request type ごとの VecDeque<JobDescriptor>
//! - submit で enqueue + arrival 通知
//! - completion を購読して JobId ごとに待ち手（JobTicket）へ返す

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::bus::NotificationBus;
use crate::domain::{JobDescriptor, JobId, RequestType, ResultPayload};
use crate::error::SourceError;
use crate::ports::JobSource;

/// Handle returned by [`InMemoryServer::submit`]; resolves with the job's result.
#[derive(Debug)]
pub struct JobTicket {
    id: JobId,
    rx: oneshot::Receiver<ResultPayload>,
}

impl JobTicket {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the completion. `None` if the server went away first.
    pub async fn wait(self) -> Option<ResultPayload> {
        self.rx.await.ok()
    }
}

/// In-memory implementation of the server side.
///
/// # 使用例
/// ```ignore
/// let bus = NotificationBus::default();
/// let server = Arc::new(InMemoryServer::new(bus.clone()));
/// let _listener = server.spawn_completion_listener();
///
/// let ticket = server.submit("sum", json!({"a": 2, "b": 3})).await;
/// let result = ticket.wait().await;
/// ```
pub struct InMemoryServer {
    queues: Mutex<HashMap<RequestType, VecDeque<JobDescriptor>>>,
    waiting: Mutex<HashMap<JobId, oneshot::Sender<ResultPayload>>>,
    bus: NotificationBus,
}

impl InMemoryServer {
    pub fn new(bus: NotificationBus) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            waiting: Mutex::new(HashMap::new()),
            bus,
        }
    }

    /// Queue a client job and announce its arrival.
    pub async fn submit(
        &self,
        request_type: impl Into<RequestType>,
        payload: serde_json::Value,
    ) -> JobTicket {
        let job = JobDescriptor::new(request_type.into(), payload);
        let id = job.id();
        let request_type = job.request_type().clone();

        let (tx, rx) = oneshot::channel();
        self.waiting.lock().await.insert(id, tx);

        self.enqueue(job).await;
        tracing::debug!(job_id = %id, request_type = %request_type, "job submitted");
        self.bus.announce(request_type);

        JobTicket { id, rx }
    }

    /// Push a descriptor to the tail of its queue without announcing it.
    pub async fn enqueue(&self, job: JobDescriptor) -> JobId {
        let id = job.id();
        let mut queues = self.queues.lock().await;
        queues
            .entry(job.request_type().clone())
            .or_default()
            .push_back(job);
        id
    }

    /// Number of queued jobs for `request_type`.
    pub async fn len(&self, request_type: &RequestType) -> usize {
        let queues = self.queues.lock().await;
        queues.get(request_type).map_or(0, VecDeque::len)
    }

    /// Pair completions with their tickets.
    ///
    /// Subscribes before returning, so completions published afterwards are
    /// never missed. The task exits once the server is dropped.
    pub fn spawn_completion_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe_completions();
        let server: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let done = match rx.recv().await {
                    Ok(done) => done,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "completion listener lagged; some tickets will not resolve");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(server) = server.upgrade() else {
                    break;
                };

                let waiter = server.waiting.lock().await.remove(&done.job_id());
                match waiter {
                    Some(tx) => {
                        // the client may have dropped its ticket
                        let _ = tx.send(done.result);
                    }
                    None => {
                        tracing::debug!(job_id = %done.job_id(), "completion for unknown job");
                    }
                }
            }
        })
    }
}

#[async_trait]
impl JobSource for InMemoryServer {
    async fn next_job(
        &self,
        request_type: &RequestType,
    ) -> Result<Option<JobDescriptor>, SourceError> {
        let mut queues = self.queues.lock().await;
        Ok(queues.get_mut(request_type).and_then(VecDeque::pop_front))
    }

    async fn requeue_at_tail(&self, job: JobDescriptor) -> Result<(), SourceError> {
        self.enqueue(job).await;
        Ok(())
    }

    async fn pending(&self, request_type: &RequestType) -> Result<usize, SourceError> {
        Ok(self.len(request_type).await)
    }

    async fn pending_types(&self) -> Result<Vec<RequestType>, SourceError> {
        let queues = self.queues.lock().await;
        Ok(queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(t, _)| t.clone())
            .collect())
    }
}
