//! Handler trait - 型付き Request を処理する Handler の定義
//!
//! - `Handler<R>`: アプリが実装する型安全な表層
//! - `TypedExecutor<R, H>`: payload の decode / output の encode を行い
//!   object-safe な `Executor` に変換する（type erasure）

use std::marker::PhantomData;

use async_trait::async_trait;

use super::request::Request;
use crate::domain::JobDescriptor;
use crate::error::ExecutorError;
use crate::ports::Executor;

/// Handler は Request を処理して Output を返す
///
/// # 使用例
/// ```ignore
/// struct SumHandler;
///
/// #[async_trait]
/// impl Handler<Sum> for SumHandler {
///     async fn handle(&self, req: Sum) -> Result<i64, ExecutorError> {
///         Ok(req.a + req.b)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: R) -> Result<R::Output, ExecutorError>;
}

pub struct TypedExecutor<R: Request, H: Handler<R>> {
    handler: H,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Request, H: Handler<R>> TypedExecutor<R, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Request, H: Handler<R>> Executor for TypedExecutor<R, H> {
    async fn execute(&self, job: &JobDescriptor) -> Result<serde_json::Value, ExecutorError> {
        // decode 失敗も executor の失敗扱い（retry に回る）
        let request: R = serde_json::from_value(job.payload().clone())
            .map_err(|e| ExecutorError::with_source(format!("json decode for {}", R::TYPE), e))?;
        let output = self.handler.handle(request).await?;
        serde_json::to_value(output)
            .map_err(|e| ExecutorError::with_source(format!("json encode for {}", R::TYPE), e))
    }
}
