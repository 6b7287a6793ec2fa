//! Executor port - アプリ側が提供する処理本体
//!
//! dispatcher は中身を知らない。Job を渡して JSON を受け取るだけ。

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::JobDescriptor;
use crate::error::ExecutorError;

/// Turns a queued job into a success payload, or fails.
///
/// # 使用例
/// ```ignore
/// struct Upper;
///
/// #[async_trait]
/// impl Executor for Upper {
///     async fn execute(&self, job: &JobDescriptor) -> Result<serde_json::Value, ExecutorError> {
///         let s = job.payload().as_str().ok_or_else(|| ExecutorError::new("expected string"))?;
///         Ok(serde_json::json!(s.to_uppercase()))
///     }
/// }
/// ```
///
/// Returning `Err` makes the dispatcher wait the retry delay and push the job
/// back to the tail of its queue. Nothing is reported to the server for that
/// attempt.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, job: &JobDescriptor) -> Result<serde_json::Value, ExecutorError>;
}

/// Executor backed by a closure returning a future.
///
/// The closure receives an owned clone of the descriptor so the future can be
/// `'static`.
pub struct FnExecutor<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnExecutor<F, Fut>
where
    F: Fn(JobDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, ExecutorError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Executor for FnExecutor<F, Fut>
where
    F: Fn(JobDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, ExecutorError>> + Send,
{
    async fn execute(&self, job: &JobDescriptor) -> Result<serde_json::Value, ExecutorError> {
        (self.f)(job.clone()).await
    }
}

/// Shorthand for `Arc::new(FnExecutor::new(f))`.
pub fn executor_fn<F, Fut>(f: F) -> std::sync::Arc<dyn Executor>
where
    F: Fn(JobDescriptor) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, ExecutorError>> + Send + 'static,
{
    std::sync::Arc::new(FnExecutor::new(f))
}
