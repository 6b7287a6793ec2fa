//! Ports - 外部との境界
//!
//! - **JobSource**: サーバが持つ request type ごとのキュー
//! - **Executor**: アプリケーションが登録する処理本体

pub mod executor;
pub mod job_source;

pub use self::executor::{Executor, FnExecutor, executor_fn};
pub use self::job_source::JobSource;
