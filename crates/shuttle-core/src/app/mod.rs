//! App - dispatcher 本体
//!
//! # 主要コンポーネント
//! - **DispatcherBuilder**: 構築と起動時検証
//! - **Dispatcher**: arrival handler + registry API
//! - **drain**: request type ごとのキュー消化ループ（pop→run→report/requeue）

pub mod builder;
pub mod dispatcher;
mod drain;
mod registry;

pub use self::builder::DispatcherBuilder;
pub use self::dispatcher::{Dispatcher, DispatcherHandle};
