//! `shuttle` -- demo wiring of the dispatcher against the in-memory server.
//!
//! Registers `sum` and a `flaky` executor that fails its first calls, leaves
//! `echo` unregistered, submits a few jobs and prints every result.
//!
//! # Environment variables
//!
//! | Variable                 | Default | Description                         |
//! |--------------------------|---------|-------------------------------------|
//! | `SHUTTLE_RETRY_DELAY_MS` | `1000`  | Backoff before a failed job is requeued |
//! | `SHUTTLE_BUS_CAPACITY`   | `1024`  | Notification channel buffer         |
//! | `SHUTTLE_FLAKY_FAILURES` | `2`     | How many times `flaky` fails first  |
//! | `RUST_LOG`               | `shuttle=info,shuttle_core=info` | Log filter |

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shuttle_core::typed::{Handler, Request};
use shuttle_core::{
    ConfigError, DispatcherBuilder, DispatcherConfig, ExecutorError, InMemoryServer,
    NotificationBus, ShuttleError,
};

const FLAKY_FAILURES_ENV: &str = "SHUTTLE_FLAKY_FAILURES";
const DEFAULT_FLAKY_FAILURES: u32 = 2;

fn flaky_failures_from_env() -> Result<u32, ConfigError> {
    parse_flaky_failures(std::env::var(FLAKY_FAILURES_ENV).ok())
}

fn parse_flaky_failures(raw: Option<String>) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_FLAKY_FAILURES);
    };
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        key: FLAKY_FAILURES_ENV,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct Sum {
    a: i64,
    b: i64,
}

impl Request for Sum {
    const TYPE: &'static str = "sum";
    type Output = i64;
}

struct SumHandler;

#[async_trait]
impl Handler<Sum> for SumHandler {
    async fn handle(&self, req: Sum) -> Result<i64, ExecutorError> {
        req.a
            .checked_add(req.b)
            .ok_or_else(|| ExecutorError::new("sum overflows i64"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Hello {
    name: String,
}

impl Request for Hello {
    const TYPE: &'static str = "flaky";
    type Output = String;
}

struct FlakyHandler {
    remaining_failures: AtomicU32,
}

impl FlakyHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Handler<Hello> for FlakyHandler {
    async fn handle(&self, req: Hello) -> Result<String, ExecutorError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ExecutorError::new(format!("intentional failure (left={left})")));
        }
        Ok(format!("Hello, {}!", req.name))
    }
}

#[tokio::main]
async fn main() -> Result<(), ShuttleError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shuttle=info,shuttle_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DispatcherConfig::from_env()?;
    let flaky_failures = flaky_failures_from_env()?;

    tracing::info!(
        retry_delay_ms = config.retry_delay.as_millis() as u64,
        bus_capacity = config.bus_capacity,
        flaky_failures,
        "Starting shuttle demo",
    );

    // (A) bus + server
    let bus = NotificationBus::new(config.bus_capacity);
    let server = Arc::new(InMemoryServer::new(bus.clone()));
    let _listener = server.spawn_completion_listener();

    // (B) dispatcher: echo は登録しない（fallback の確認用）
    let dispatcher = DispatcherBuilder::new(server.clone(), bus)
        .config(config)
        .register_typed::<Sum, _>(SumHandler)
        .register_typed::<Hello, _>(FlakyHandler::new(flaky_failures))
        .expect_types(&[Sum::TYPE, Hello::TYPE])
        .build()?;
    let handle = dispatcher.spawn();

    // (C) submit
    let tickets = vec![
        server.submit(Sum::TYPE, serde_json::json!({ "a": 2, "b": 3 })).await,
        server.submit(Hello::TYPE, serde_json::json!({ "name": "shuttle" })).await,
        server.submit("echo", serde_json::json!("J1")).await,
        server.submit("echo", serde_json::json!("J2")).await,
    ];

    // (D) wait for every completion
    for ticket in tickets {
        let id = ticket.id();
        match ticket.wait().await {
            Some(result) => {
                let rendered = serde_json::to_string(&result)
                    .unwrap_or_else(|e| format!("<unprintable result: {e}>"));
                println!("{id}: {rendered}");
            }
            None => tracing::warn!(job_id = %id, "server dropped the ticket"),
        }
    }

    for status in dispatcher.status().await {
        tracing::info!(
            request_type = %status.request_type,
            draining = status.draining,
            fallback = status.fallback,
            "entry",
        );
    }
    tracing::info!(stats = ?dispatcher.stats(), "all jobs completed");

    handle.shutdown_and_join().await;
    Ok(())
}
