//! JobSource port - サーバ側のジョブキュー
//!
//! キューの正本はサーバが持つ。dispatcher は head から取り出し、
//! 失敗したら tail に戻すだけ。

use async_trait::async_trait;

use crate::domain::{JobDescriptor, RequestType};
use crate::error::SourceError;

/// Per-type FIFO queues owned by the server.
///
/// # Contract
/// - `next_job` pops the head of `request_type`'s queue.
/// - `requeue_at_tail` puts a previously popped descriptor back behind
///   everything currently queued for its type.
/// - `pending` is used to close the race between "queue was empty" and
///   "drain flag cleared"; it must reflect jobs enqueued before the call.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn next_job(&self, request_type: &RequestType)
        -> Result<Option<JobDescriptor>, SourceError>;

    async fn requeue_at_tail(&self, job: JobDescriptor) -> Result<(), SourceError>;

    async fn pending(&self, request_type: &RequestType) -> Result<usize, SourceError>;

    /// Types that currently have queued jobs.
    ///
    /// Used to resynchronize after missed arrival notifications. Sources that
    /// cannot answer cheaply may return an empty list.
    async fn pending_types(&self) -> Result<Vec<RequestType>, SourceError> {
        Ok(Vec::new())
    }
}
