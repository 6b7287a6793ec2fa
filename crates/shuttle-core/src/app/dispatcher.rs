//! Dispatcher - arrival を受けて request type ごとの drain loop を起動する
//!
//! - arrival ごとに HandlerEntry を引く（なければ fallback を合成）
//! - is_draining が false のときだけ drain loop を spawn
//! - registry / flag は dispatcher が所有する Mutex の中だけで変更する

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use super::drain;
use super::registry::HandlerRegistry;
use crate::bus::NotificationBus;
use crate::config::DispatcherConfig;
use crate::domain::RequestType;
use crate::observability::{Counters, DispatchStats, EntryStatus};
use crate::ports::{Executor, JobSource};
use crate::typed::{Handler, Request, TypedExecutor};

pub(crate) struct Inner {
    pub(crate) registry: Mutex<HandlerRegistry>,
    pub(crate) source: Arc<dyn JobSource>,
    pub(crate) bus: NotificationBus,
    pub(crate) config: DispatcherConfig,
    pub(crate) counters: Counters,
}

impl Inner {
    pub(crate) fn new(
        source: Arc<dyn JobSource>,
        bus: NotificationBus,
        config: DispatcherConfig,
    ) -> Self {
        Self::with_registry(HandlerRegistry::new(), source, bus, config)
    }

    pub(crate) fn with_registry(
        registry: HandlerRegistry,
        source: Arc<dyn JobSource>,
        bus: NotificationBus,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry: Mutex::new(registry),
            source,
            bus,
            config,
            counters: Counters::default(),
        }
    }
}

/// Demand-driven dispatcher: drains each request type's queue on arrival.
///
/// Cheap to clone; clones share the same registry.
///
/// # 使用例
/// ```ignore
/// let bus = NotificationBus::default();
/// let server = Arc::new(InMemoryServer::new(bus.clone()));
/// let dispatcher = Dispatcher::new(server.clone(), bus, DispatcherConfig::default());
/// dispatcher.register_typed::<Sum, _>(SumHandler).await;
/// let handle = dispatcher.spawn();
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn JobSource>, bus: NotificationBus, config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner::new(source, bus, config)),
        }
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Install or replace the executor for `request_type`.
    ///
    /// Safe while traffic is flowing: a loop already draining this type keeps
    /// going and uses the new executor from its next job on.
    pub async fn register(&self, request_type: impl Into<RequestType>, executor: Arc<dyn Executor>) {
        let request_type = request_type.into();
        tracing::debug!(request_type = %request_type, "executor registered");
        self.inner.registry.lock().await.register(request_type, executor);
    }

    pub async fn register_typed<R: Request, H: Handler<R> + 'static>(&self, handler: H) {
        self.register(R::TYPE, Arc::new(TypedExecutor::<R, H>::new(handler)))
            .await;
    }

    /// React to "a job of `request_type` arrived".
    ///
    /// Creates a fallback entry for unknown types and starts a drain loop
    /// unless one is already running for this type. The loop is spawned, never
    /// run inline.
    pub async fn on_arrival(&self, request_type: RequestType) {
        self.inner.counters.arrival();

        let start = {
            let mut registry = self.inner.registry.lock().await;
            if registry.ensure(&request_type) {
                tracing::warn!(request_type = %request_type, "no handler registered; answering with errors");
            }
            registry.try_begin_drain(&request_type)
        };

        if !start {
            tracing::trace!(request_type = %request_type, "already draining");
            return;
        }

        self.inner.counters.drain_started();
        tokio::spawn(drain::run(Arc::clone(&self.inner), request_type));
    }

    /// Re-trigger every known type and every type the source reports as
    /// non-empty. Used after missed arrival notifications.
    pub async fn resync(&self) {
        let mut types = self.inner.registry.lock().await.request_types();
        match self.inner.source.pending_types().await {
            Ok(pending) => types.extend(pending),
            Err(e) => tracing::error!(error = %e, "pending_types failed during resync"),
        }
        types.sort();
        types.dedup();

        for request_type in types {
            self.on_arrival(request_type).await;
        }
    }

    /// Subscribe to arrivals and start handling them in the background.
    ///
    /// The subscription is taken before this returns, so arrivals announced
    /// afterwards are never missed.
    pub fn spawn(&self) -> DispatcherHandle {
        let arrivals = self.inner.bus.subscribe_arrivals();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = self.clone();
        let join = tokio::spawn(async move {
            arrival_loop(dispatcher, arrivals, shutdown_rx).await;
        });

        DispatcherHandle { shutdown_tx, join }
    }

    pub async fn status(&self) -> Vec<EntryStatus> {
        self.inner.registry.lock().await.statuses()
    }

    pub fn stats(&self) -> DispatchStats {
        self.inner.counters.snapshot()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }
}

/// Handle for the background arrival listener.
///
/// - `request_shutdown()` で arrival の受信を止める
/// - 動いている drain loop は止めない（キューが空になるまで走る）
/// - handle を drop しても listener は止まらない
pub struct DispatcherHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn request_shutdown(&self) {
        // ignore send error: listener may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "arrival listener panicked");
        }
    }
}

async fn arrival_loop(
    dispatcher: Dispatcher,
    mut arrivals: broadcast::Receiver<RequestType>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut watching_shutdown = true;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let received = tokio::select! {
            changed = shutdown_rx.changed(), if watching_shutdown => {
                if changed.is_err() {
                    // handle dropped: keep running, just stop watching
                    watching_shutdown = false;
                }
                continue;
            }
            received = arrivals.recv() => received,
        };

        match received {
            Ok(request_type) => {
                tracing::debug!(request_type = %request_type, "arrival");
                dispatcher.on_arrival(request_type).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "arrival subscription lagged; resynchronizing");
                dispatcher.resync().await;
            }
            Err(RecvError::Closed) => break,
        }
    }

    tracing::debug!("arrival listener stopped");
}
