use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use shuttle_core::typed::{Handler, Request};
use shuttle_core::{
    Dispatcher, DispatcherConfig, DispatcherHandle, ExecutorError, InMemoryServer, JobDescriptor,
    JobDone, NotificationBus, RequestType, ResultPayload, executor_fn,
};

const WAIT: Duration = Duration::from_secs(10);

struct Harness {
    bus: NotificationBus,
    server: Arc<InMemoryServer>,
    dispatcher: Dispatcher,
    handle: DispatcherHandle,
    _listener: JoinHandle<()>,
}

fn harness_with(bus: NotificationBus) -> Harness {
    let server = Arc::new(InMemoryServer::new(bus.clone()));
    let listener = server.spawn_completion_listener();
    let dispatcher = Dispatcher::new(server.clone(), bus.clone(), DispatcherConfig::default());
    let handle = dispatcher.spawn();
    Harness {
        bus,
        server,
        dispatcher,
        handle,
        _listener: listener,
    }
}

fn harness() -> Harness {
    harness_with(NotificationBus::default())
}

async fn next_done(rx: &mut broadcast::Receiver<JobDone>) -> JobDone {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("completion within timeout")
        .expect("completion channel open")
}

async fn wait_idle(dispatcher: &Dispatcher, request_type: &str) {
    tokio::time::timeout(WAIT, async {
        loop {
            let status = dispatcher.status().await;
            let idle = status
                .iter()
                .find(|s| s.request_type.as_str() == request_type)
                .is_some_and(|s| !s.draining);
            if idle {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("entry returns to idle");
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
        Ok(req.a + req.b)
    }
}

#[tokio::test]
async fn unregistered_type_yields_ordered_error_completions() {
    let h = harness();
    let mut done_rx = h.bus.subscribe_completions();

    let j1 = h.server.submit("echo", json!("J1")).await;
    let j2 = h.server.submit("echo", json!("J2")).await;

    let first = next_done(&mut done_rx).await;
    let second = next_done(&mut done_rx).await;

    assert_eq!(first.job_id(), j1.id());
    assert_eq!(second.job_id(), j2.id());
    for done in [&first, &second] {
        assert_eq!(done.result, ResultPayload::no_handler(&RequestType::new("echo")));
        assert!(done.result.error_message().unwrap().contains("echo"));
    }

    assert_eq!(j1.wait().await, Some(first.result));
    assert_eq!(j2.wait().await, Some(second.result));
}

#[tokio::test]
async fn registered_sum_returns_five() {
    let h = harness();
    h.dispatcher.register_typed::<Sum, _>(SumHandler).await;

    let ticket = h.server.submit("sum", json!({"a": 2, "b": 3})).await;
    let result = tokio::time::timeout(WAIT, ticket.wait()).await.unwrap();

    assert_eq!(result, Some(ResultPayload::success(json!(5))));
    assert_eq!(h.dispatcher.stats().succeeded, 1);
}

#[tokio::test(start_paused = true)]
async fn flaky_executor_succeeds_after_one_second_without_error_completion() {
    let h = harness();
    let mut done_rx = h.bus.subscribe_completions();
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    h.dispatcher
        .register(
            "flaky",
            executor_fn(move |_job: JobDescriptor| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(ExecutorError::new("first call fails"));
                    }
                    Ok(json!("ok"))
                }
            }),
        )
        .await;

    let started = tokio::time::Instant::now();
    let ticket = h.server.submit("flaky", json!({})).await;

    let done = next_done(&mut done_rx).await;
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(done.job_id(), ticket.id());
    assert_eq!(done.result, ResultPayload::success(json!("ok")));
    assert_eq!(done.descriptor.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    wait_idle(&h.dispatcher, "flaky").await;
    assert!(done_rx.try_recv().is_err());
    assert_eq!(h.dispatcher.stats().retried, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_type_never_runs_concurrently() {
    let h = harness();
    let in_flight: Arc<HashMap<&'static str, AtomicUsize>> = Arc::new(
        [("alpha", AtomicUsize::new(0)), ("beta", AtomicUsize::new(0))]
            .into_iter()
            .collect(),
    );
    let overlaps = Arc::new(AtomicUsize::new(0));

    for t in ["alpha", "beta"] {
        let in_flight = in_flight.clone();
        let overlaps = overlaps.clone();
        h.dispatcher
            .register(
                t,
                executor_fn(move |_job: JobDescriptor| {
                    let in_flight = in_flight.clone();
                    let overlaps = overlaps.clone();
                    async move {
                        let counter = &in_flight[t];
                        if counter.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        counter.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, ExecutorError>(json!(t))
                    }
                }),
            )
            .await;
    }

    let mut tickets = Vec::new();
    for i in 0..20 {
        let t = if i % 2 == 0 { "alpha" } else { "beta" };
        tickets.push(h.server.submit(t, json!(i)).await);
    }
    for ticket in tickets {
        let result = tokio::time::timeout(WAIT, ticket.wait()).await.unwrap();
        assert!(matches!(result, Some(ResultPayload::Success { .. })));
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(h.dispatcher.stats().succeeded, 20);
}

#[tokio::test(start_paused = true)]
async fn every_job_gets_exactly_one_completion() {
    let h = harness();
    let mut done_rx = h.bus.subscribe_completions();
    // fails the first execution of every odd job
    h.dispatcher
        .register(
            "mixed",
            executor_fn(|job: JobDescriptor| async move {
                let n = job.payload().as_i64().unwrap_or_default();
                if n % 2 == 1 && job.attempts() == 0 {
                    return Err(ExecutorError::new("odd job fails once"));
                }
                Ok(json!(n))
            }),
        )
        .await;

    let mut ids = Vec::new();
    for n in 0..6 {
        ids.push(h.server.submit("mixed", json!(n)).await.id());
    }
    ids.push(h.server.submit("unknown", json!(null)).await.id());

    let mut seen = HashMap::new();
    for _ in 0..ids.len() {
        let done = next_done(&mut done_rx).await;
        *seen.entry(done.job_id()).or_insert(0) += 1;
    }

    wait_idle(&h.dispatcher, "mixed").await;
    wait_idle(&h.dispatcher, "unknown").await;
    assert!(done_rx.try_recv().is_err());
    for id in ids {
        assert_eq!(seen.get(&id), Some(&1), "job {id} completed once");
    }
}

#[tokio::test]
async fn drained_type_goes_idle_and_rearms_on_next_arrival() {
    let h = harness();
    h.dispatcher.register_typed::<Sum, _>(SumHandler).await;

    let first = h.server.submit("sum", json!({"a": 1, "b": 1})).await;
    assert_eq!(
        tokio::time::timeout(WAIT, first.wait()).await.unwrap(),
        Some(ResultPayload::success(json!(2)))
    );
    wait_idle(&h.dispatcher, "sum").await;

    let second = h.server.submit("sum", json!({"a": 20, "b": 22})).await;
    assert_eq!(
        tokio::time::timeout(WAIT, second.wait()).await.unwrap(),
        Some(ResultPayload::success(json!(42)))
    );
    assert_eq!(h.dispatcher.stats().drains_started, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_job_is_retried_behind_later_jobs() {
    let h = harness();
    let mut done_rx = h.bus.subscribe_completions();
    h.dispatcher
        .register(
            "flaky",
            executor_fn(|job: JobDescriptor| async move {
                if job.payload() == &json!("J1") && job.attempts() == 0 {
                    return Err(ExecutorError::new("J1 fails once"));
                }
                Ok(json!({ "job": job.payload(), "attempt": job.attempts() }))
            }),
        )
        .await;

    let j1 = h.server.submit("flaky", json!("J1")).await;
    let j2 = h.server.submit("flaky", json!("J2")).await;

    let first = next_done(&mut done_rx).await;
    let second = next_done(&mut done_rx).await;

    assert_eq!(first.job_id(), j2.id());
    assert_eq!(second.job_id(), j1.id());
    assert_eq!(
        second.result,
        ResultPayload::success(json!({ "job": "J1", "attempt": 1 }))
    );
}

#[tokio::test]
async fn registering_mid_drain_keeps_the_loop_running() {
    let h = harness();
    let mut done_rx = h.bus.subscribe_completions();
    let gate = Arc::new(tokio::sync::Notify::new());
    let g = gate.clone();
    h.dispatcher
        .register(
            "swap",
            executor_fn(move |_job: JobDescriptor| {
                let g = g.clone();
                async move {
                    g.notified().await;
                    Ok::<_, ExecutorError>(json!("old"))
                }
            }),
        )
        .await;

    h.server.submit("swap", json!(1)).await;
    h.server.submit("swap", json!(2)).await;
    tokio::time::timeout(WAIT, async {
        while h.server.len(&RequestType::new("swap")).await != 1 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    h.dispatcher
        .register(
            "swap",
            executor_fn(|_job: JobDescriptor| async move { Ok::<_, ExecutorError>(json!("new")) }),
        )
        .await;
    gate.notify_one();

    assert_eq!(next_done(&mut done_rx).await.result, ResultPayload::success(json!("old")));
    assert_eq!(next_done(&mut done_rx).await.result, ResultPayload::success(json!("new")));
    assert_eq!(h.dispatcher.stats().drains_started, 1);
}

#[tokio::test]
async fn late_registration_replaces_fallback() {
    let h = harness();

    let before = h.server.submit("sum", json!({"a": 2, "b": 3})).await;
    let result = tokio::time::timeout(WAIT, before.wait()).await.unwrap().unwrap();
    assert!(result.is_error());
    wait_idle(&h.dispatcher, "sum").await;

    h.dispatcher.register_typed::<Sum, _>(SumHandler).await;
    let after = h.server.submit("sum", json!({"a": 2, "b": 3})).await;
    assert_eq!(
        tokio::time::timeout(WAIT, after.wait()).await.unwrap(),
        Some(ResultPayload::success(json!(5)))
    );

    let status = h.dispatcher.status().await;
    assert!(!status[0].fallback);
}

#[tokio::test]
async fn unregistered_traffic_does_not_block_other_types() {
    let h = harness();
    h.dispatcher.register_typed::<Sum, _>(SumHandler).await;

    let _noise = h.server.submit("nobody-home", json!(null)).await;
    let ticket = h.server.submit("sum", json!({"a": 4, "b": 4})).await;

    assert_eq!(
        tokio::time::timeout(WAIT, ticket.wait()).await.unwrap(),
        Some(ResultPayload::success(json!(8)))
    );
}

#[tokio::test]
async fn lagged_arrivals_are_recovered() {
    let h = harness_with(NotificationBus::new(2));

    for i in 0..8 {
        h.server.submit(format!("type-{i}"), json!(i)).await;
    }

    tokio::time::timeout(WAIT, async {
        loop {
            let mut pending = 0;
            for i in 0..8 {
                pending += h.server.len(&RequestType::new(format!("type-{i}"))).await;
            }
            if pending == 0 && h.dispatcher.stats().synthesized_errors == 8 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every queue drained");
}

#[tokio::test]
async fn independent_dispatchers_do_not_share_registries() {
    let a = harness();
    let b = harness();
    a.dispatcher.register_typed::<Sum, _>(SumHandler).await;

    let on_a = a.server.submit("sum", json!({"a": 1, "b": 2})).await;
    let on_b = b.server.submit("sum", json!({"a": 1, "b": 2})).await;

    assert_eq!(
        tokio::time::timeout(WAIT, on_a.wait()).await.unwrap(),
        Some(ResultPayload::success(json!(3)))
    );
    assert!(
        tokio::time::timeout(WAIT, on_b.wait())
            .await
            .unwrap()
            .unwrap()
            .is_error()
    );

    a.handle.shutdown_and_join().await;
    b.handle.shutdown_and_join().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_executor_is_retried_and_type_keeps_draining() {
    let h = harness();
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    h.dispatcher
        .register(
            "fragile",
            executor_fn(move |job: JobDescriptor| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("executor blew up");
                    }
                    Ok::<_, ExecutorError>(job.payload().clone())
                }
            }),
        )
        .await;

    let first = h.server.submit("fragile", json!("J1")).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = h.server.submit("fragile", json!("J2")).await;

    let r1 = tokio::time::timeout(WAIT, first.wait()).await.unwrap();
    let r2 = tokio::time::timeout(WAIT, second.wait()).await.unwrap();
    assert_eq!(r1, Some(ResultPayload::success(json!("J1"))));
    assert_eq!(r2, Some(ResultPayload::success(json!("J2"))));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    wait_idle(&h.dispatcher, "fragile").await;
    assert_eq!(h.dispatcher.stats().retried, 1);
}
