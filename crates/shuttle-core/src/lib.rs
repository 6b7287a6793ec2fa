//! shuttle-core
//!
//! Demand-driven job dispatcher. The server announces "a job of type T
//! arrived"; the dispatcher drains T's queue one job at a time through the
//! executor registered for T and publishes every result back.
//!
//! # モジュール構成
//! - **domain**: RequestType, JobDescriptor, ResultPayload, JobDone
//! - **ports**: JobSource（サーバ側キュー）, Executor（アプリ側処理）
//! - **app**: Dispatcher, DispatcherBuilder, drain loop
//! - **typed**: 型付き Executor API（Request, Handler, TypedExecutor）
//! - **bus**: arrival / completion の通知チャネル
//! - **impls**: InMemoryServer（開発・テスト用）
//! - **config**, **error**, **observability**

pub mod app;
pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use app::{Dispatcher, DispatcherBuilder, DispatcherHandle};
pub use bus::NotificationBus;
pub use config::DispatcherConfig;
pub use domain::{JobDescriptor, JobDone, JobId, RequestType, ResultPayload};
pub use error::{BuildError, ConfigError, ExecutorError, ShuttleError, SourceError};
pub use impls::{InMemoryServer, JobTicket};
pub use observability::{DispatchStats, EntryStatus};
pub use ports::{Executor, JobSource, executor_fn};
