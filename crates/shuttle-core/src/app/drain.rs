//! Drain loop - 1 request type につき 1 タスク
//!
//! # フロー
//! 1. JobSource::next_job() で head を取得
//! 2. 空なら is_draining を下ろして終了（下ろしたあと pending を再確認）
//! 3. runner を実行
//!    - 成功 → JobDone を publish
//!    - 失敗 / panic → retry_delay 待って tail に戻す（publish しない）
//! 4. 1 に戻る

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::dispatcher::Inner;
use crate::domain::{JobDescriptor, JobDone, RequestType, ResultPayload};
use crate::error::ExecutorError;

pub(crate) async fn run(inner: Arc<Inner>, request_type: RequestType) {
    tracing::debug!(request_type = %request_type, "drain started");

    loop {
        let job = match inner.source.next_job(&request_type).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                if release(&inner, &request_type).await {
                    continue;
                }
                break;
            }
            Err(e) => {
                tracing::error!(request_type = %request_type, error = %e, "next_job failed; backing off");
                tokio::time::sleep(inner.config.retry_delay).await;
                continue;
            }
        };

        process(&inner, job).await;
    }

    tracing::debug!(request_type = %request_type, "drain finished");
}

/// Clear the draining flag, then look again.
///
/// A job queued after `next_job` returned `None` but before the flag was
/// cleared had its arrival swallowed by the de-duplication. Returns `true`
/// if this loop took ownership back and must keep draining.
async fn release(inner: &Inner, request_type: &RequestType) -> bool {
    inner.registry.lock().await.finish_drain(request_type);

    match inner.source.pending(request_type).await {
        Ok(0) => false,
        Ok(_) => {
            let reacquired = inner.registry.lock().await.try_begin_drain(request_type);
            if reacquired {
                inner.counters.drain_started();
            }
            reacquired
        }
        Err(e) => {
            // the next arrival restarts the loop
            tracing::error!(request_type = %request_type, error = %e, "pending check failed");
            false
        }
    }
}

/// Run one job and report it.
pub(crate) async fn process(inner: &Inner, mut job: JobDescriptor) {
    let request_type = job.request_type().clone();
    let runner = inner.registry.lock().await.checkout(&request_type);

    let Some(runner) = runner else {
        tracing::error!(job_id = %job.id(), request_type = %request_type, "no handler entry at drain time");
        inner.counters.synthesized_error();
        inner.bus.complete(JobDone::new(job, ResultPayload::could_not_process(&request_type)));
        return;
    };

    let outcome = AssertUnwindSafe(runner.run(&job))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(ExecutorError::new(format!(
                "executor panicked: {}",
                panic_message(&*panic)
            )))
        });

    match outcome {
        Ok(result) => {
            if result.is_error() {
                inner.counters.synthesized_error();
            } else {
                inner.counters.succeeded();
            }
            tracing::debug!(job_id = %job.id(), request_type = %request_type, "job done");
            inner.bus.complete(JobDone::new(job, result));
        }
        Err(err) => {
            tracing::warn!(
                job_id = %job.id(),
                request_type = %request_type,
                attempts = job.attempts() + 1,
                error = %err,
                "executor failed; requeueing after delay",
            );
            tokio::time::sleep(inner.config.retry_delay).await;

            job.record_failure();
            inner.counters.retried();
            if let Err(e) = inner.source.requeue_at_tail(job.clone()).await {
                tracing::error!(job_id = %job.id(), error = %e, "requeue failed; giving up on job");
                inner.counters.synthesized_error();
                inner.bus.complete(JobDone::new(job, ResultPayload::could_not_process(&request_type)));
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
