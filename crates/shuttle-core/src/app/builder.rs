//! DispatcherBuilder - dispatcher の構築とワイヤリング
//!
//! - 起動前にまとめて executor を登録できる
//! - expect_types() で「登録されているはず」の request type を宣言し、
//!   build() 時に不足を BuildError として返す（Fail-fast）
//!
//! 登録されていない type の traffic 自体は実行時にも処理できる（fallback）。
//! ここでのチェックは設定漏れを起動時に見つけるためのもの。

use std::sync::Arc;

use super::dispatcher::{Dispatcher, Inner};
use super::registry::HandlerRegistry;
use crate::bus::NotificationBus;
use crate::config::DispatcherConfig;
use crate::domain::RequestType;
use crate::error::BuildError;
use crate::ports::{Executor, JobSource};
use crate::typed::{Handler, Request, TypedExecutor};

/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new(server.clone(), bus.clone())
///     .config(DispatcherConfig::from_env()?)
///     .register_typed::<Sum, _>(SumHandler)
///     .expect_types(&["sum"])
///     .build()?;
/// ```
pub struct DispatcherBuilder {
    source: Arc<dyn JobSource>,
    bus: NotificationBus,
    config: DispatcherConfig,
    registry: HandlerRegistry,
    expected_types: Option<Vec<String>>,
}

impl DispatcherBuilder {
    pub fn new(source: Arc<dyn JobSource>, bus: NotificationBus) -> Self {
        Self {
            source,
            bus,
            config: DispatcherConfig::default(),
            registry: HandlerRegistry::new(),
            expected_types: None,
        }
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an executor; a later registration for the same type wins.
    pub fn register(
        mut self,
        request_type: impl Into<RequestType>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        self.registry.register(request_type.into(), executor);
        self
    }

    pub fn register_typed<R: Request, H: Handler<R> + 'static>(self, handler: H) -> Self {
        self.register(R::TYPE, Arc::new(TypedExecutor::<R, H>::new(handler)))
    }

    pub fn expect_types(mut self, request_types: &[&str]) -> Self {
        self.expected_types = Some(request_types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// # 検証
    /// expect_types() の type が全て登録済みか。不足があれば
    /// BuildError::MissingRequestTypes（宣言順）。
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(expected) = &self.expected_types {
            let registered = self.registry.registered_types();
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !registered.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingRequestTypes(missing));
            }
        }

        Ok(Dispatcher::from_inner(Inner::with_registry(
            self.registry,
            self.source,
            self.bus,
            self.config,
        )))
    }
}
