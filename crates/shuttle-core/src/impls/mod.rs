//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryServer**: JobSource + JobTicket による completion の受け取り

pub mod inmem_server;

pub use self::inmem_server::{InMemoryServer, JobTicket};
