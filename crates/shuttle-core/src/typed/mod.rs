//! Typed - 型付き Executor API
//!
//! request type の typo を型で排除し、payload の decode を一箇所にまとめる。
//!
//! # 二層構造
//! - **表層（Typed）**: `Request` trait, `Handler<R>` trait - 型安全
//! - **内部（Dyn）**: `ports::Executor` - object-safe, dispatcher が保持する形

pub mod handler;
pub mod request;

pub use self::handler::{Handler, TypedExecutor};
pub use self::request::Request;
