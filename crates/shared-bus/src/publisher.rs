//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the bus itself.
//!
//! Publishing is synchronous: it records the event and enqueues it. A single
//! worker task drains the queue strictly sequentially, so handlers never run
//! concurrently with each other.

use crate::events::CrossSystemEvent;
use crate::history::EventHistory;
use crate::metrics::MetricsTable;
use crate::queue::{Origin, Pending, PendingQueue};
use crate::subscriber::{EventHandler, HandlerRegistry, SubscriptionId};
use crate::transport::{Transport, TransportCallback, TransportError};
use crate::{DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use integration_telemetry::{
    log_bus_event, BUS_DEAD_LETTERS, BUS_EVENTS_DELIVERED, BUS_EVENTS_EXPIRED,
    BUS_EVENTS_PUBLISHED, BUS_HANDLER_FAILURES, BUS_QUEUE_DEPTH, BUS_RETRIES,
};
use parking_lot::{Mutex, RwLock};
use shared_types::{EventId, EventKind, IntegrationMetrics};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Errors returned by bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was shut down.
    #[error("event bus is closed")]
    Closed,

    /// An event could not be encoded or decoded.
    #[error("event serialization failed: {0}")]
    Serialization(String),

    /// The transport rejected an operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operation needs a transport and none is attached.
    #[error("no transport attached")]
    NoTransport,
}

/// Trait for publishing events to the bus.
///
/// This is the interface components use to emit events without depending
/// on the concrete bus.
pub trait EventPublisher: Send + Sync {
    /// Accept an event for delivery.
    ///
    /// Returns once the event is queued; delivery happens on the bus task.
    fn publish(&self, event: CrossSystemEvent) -> Result<EventId, BusError>;
}

/// Bus tuning.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Events retained for `get_event` and correlation lookups.
    pub history_capacity: usize,
    /// Delay before a failed critical event is re-queued.
    pub retry_delay: Duration,
    /// Re-attempts before a critical event is dead-lettered.
    pub max_retries: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// What happens to queued events at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Deliver everything still queued, including pending retries.
    Drain,
    /// Discard what is queued and log it.
    Drop,
}

/// A critical event abandoned after exhausting its retries.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub event: CrossSystemEvent,
    /// Retries performed before abandoning.
    pub attempts: u32,
    pub abandoned_at: DateTime<Utc>,
}

const RUNNING: u8 = 0;
const DRAINING: u8 = 1;
const STOPPED: u8 = 2;

/// Prioritized in-process event bus.
pub struct EventBus {
    self_ref: Weak<EventBus>,
    config: BusConfig,
    queue: Mutex<PendingQueue>,
    wakeup: Notify,
    handlers: RwLock<HandlerRegistry>,
    history: RwLock<EventHistory>,
    metrics: Mutex<MetricsTable>,
    dead_letters: Mutex<Vec<DeadLetter>>,
    transport: Option<Arc<dyn Transport>>,
    state: AtomicU8,
    inflight_retries: AtomicUsize,
    processed: AtomicU64,
    // Held for the whole delivery of one event.
    delivery: tokio::sync::Mutex<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Create a bus with no transport.
    pub fn new(config: BusConfig) -> Arc<Self> {
        Self::build(config, None)
    }

    /// Create a bus that forwards locally published events to `transport`.
    pub fn with_transport(config: BusConfig, transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::build(config, Some(transport))
    }

    fn build(config: BusConfig, transport: Option<Arc<dyn Transport>>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            history: RwLock::new(EventHistory::new(config.history_capacity)),
            config,
            queue: Mutex::new(PendingQueue::new()),
            wakeup: Notify::new(),
            handlers: RwLock::new(HandlerRegistry::new()),
            metrics: Mutex::new(MetricsTable::new()),
            dead_letters: Mutex::new(Vec::new()),
            transport,
            state: AtomicU8::new(RUNNING),
            inflight_retries: AtomicUsize::new(0),
            processed: AtomicU64::new(0),
            delivery: tokio::sync::Mutex::new(()),
            worker: Mutex::new(None),
        })
    }

    /// Spawn the processing task. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            warn!("Event bus already started");
            return;
        }
        let Some(bus) = self.self_ref.upgrade() else {
            return;
        };
        *worker = Some(tokio::spawn(async move { bus.run().await }));
        info!("Event bus started");
    }

    /// Whether new events are still accepted.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    /// Subscribe a handler to one kind.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        debug!(kind = %kind, handler = handler.name(), "Handler subscribed");
        self.handlers.write().subscribe(kind, handler)
    }

    /// Subscribe a handler to every kind.
    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        debug!(handler = handler.name(), "Wildcard handler subscribed");
        self.handlers.write().subscribe_all(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.write().unsubscribe(id)
    }

    /// Ids of retained events sharing `correlation_id`, in publish order.
    pub fn event_correlation(&self, correlation_id: &str) -> Vec<EventId> {
        self.history.read().correlation(correlation_id)
    }

    /// A retained event by id.
    pub fn get_event(&self, id: &EventId) -> Option<CrossSystemEvent> {
        self.history.read().get(id).map(|event| (*event).clone())
    }

    pub fn metrics(&self, system: &str) -> Option<IntegrationMetrics> {
        self.metrics.lock().get(system)
    }

    pub fn all_metrics(&self) -> BTreeMap<String, IntegrationMetrics> {
        self.metrics.lock().snapshot()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Queued event ids in the order they will be delivered.
    pub fn pending_ids(&self) -> Vec<EventId> {
        self.queue.lock().ids()
    }

    /// Events dequeued so far, delivered or expired.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().clone()
    }

    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.clone()
    }

    /// Feed messages arriving on `topic` from the transport into this bus.
    ///
    /// Inbound events are delivered locally but never forwarded back. An
    /// event whose id is already in history is ignored, which drops the
    /// echo of our own forwarded events.
    pub async fn attach_inbound(&self, topic: &str) -> Result<(), BusError> {
        let transport = self.transport.clone().ok_or(BusError::NoTransport)?;
        let bus = self.self_ref.clone();
        let topic_name = topic.to_string();
        let callback: TransportCallback = Arc::new(move |bytes: Vec<u8>| {
            if let Some(bus) = bus.upgrade() {
                bus.receive_remote(&topic_name, &bytes);
            }
        });
        transport.subscribe(topic, callback).await?;
        info!(topic, "Inbound transport topic attached");
        Ok(())
    }

    /// Deliver everything currently queued on the calling task.
    ///
    /// Returns the number of events dequeued. Safe alongside a started
    /// worker: each event is popped and delivered under the same lock.
    /// Scheduled retries that have not been re-queued yet are not waited for.
    pub async fn process_pending(&self) -> usize {
        let mut count = 0;
        while self.deliver_next().await {
            count += 1;
        }
        count
    }

    /// Stop accepting events and stop the processing task.
    pub async fn shutdown(&self, mode: ShutdownMode) {
        let target = match mode {
            ShutdownMode::Drain => DRAINING,
            ShutdownMode::Drop => STOPPED,
        };
        let previous = self.state.swap(target, Ordering::SeqCst);
        if previous == STOPPED {
            self.state.store(STOPPED, Ordering::SeqCst);
            debug!("Event bus already stopped");
            return;
        }

        if mode == ShutdownMode::Drop {
            let dropped = self.queue.lock().drain();
            self.update_depth();
            if !dropped.is_empty() {
                let ids: Vec<String> = dropped.iter().map(|p| p.event.id.to_string()).collect();
                warn!(count = dropped.len(), ids = ?ids, "Dropped pending events at shutdown");
            }
        }
        self.wakeup.notify_one();

        let worker = self.worker.lock().take();
        match worker {
            Some(handle) => {
                if let Err(e) = handle.await {
                    error!(error = %e, "Event bus worker terminated abnormally");
                }
            }
            None if mode == ShutdownMode::Drain => self.run().await,
            None => {}
        }

        self.state.store(STOPPED, Ordering::SeqCst);
        let stranded = self.queue.lock().drain();
        if !stranded.is_empty() {
            self.update_depth();
            let ids: Vec<String> = stranded.iter().map(|p| p.event.id.to_string()).collect();
            warn!(count = stranded.len(), ids = ?ids, "Undelivered events discarded at shutdown");
        }
        info!(
            processed = self.processed_count(),
            dead_letters = self.dead_letters.lock().len(),
            "Event bus stopped"
        );
    }

    async fn run(&self) {
        loop {
            if self.state.load(Ordering::SeqCst) == STOPPED {
                break;
            }
            if self.deliver_next().await {
                continue;
            }
            // A retry re-queues before it leaves the in-flight count.
            if self.state.load(Ordering::SeqCst) == DRAINING
                && self.inflight_retries.load(Ordering::SeqCst) == 0
                && self.queue.lock().is_empty()
            {
                break;
            }
            self.wakeup.notified().await;
        }
    }

    /// Pop one event and deliver it; false if the queue was empty.
    ///
    /// The delivery lock is held from pop to completion so events leave the
    /// queue one at a time and in order.
    async fn deliver_next(&self) -> bool {
        let _delivery = self.delivery.lock().await;
        match self.pop() {
            Some(pending) => {
                self.process(pending).await;
                true
            }
            None => false,
        }
    }

    fn pop(&self) -> Option<Pending> {
        let next = self.queue.lock().pop();
        if next.is_some() {
            self.update_depth();
        }
        next
    }

    fn enqueue(&self, pending: Pending) {
        self.queue.lock().push(pending);
        self.update_depth();
        self.wakeup.notify_one();
    }

    fn update_depth(&self) {
        BUS_QUEUE_DEPTH.set(self.queue.lock().len() as f64);
    }

    fn record_accepted(&self, event: &CrossSystemEvent) {
        self.metrics.lock().record_published(&event.source);
        BUS_EVENTS_PUBLISHED
            .with_label_values(&[event.topic(), event.source.as_str()])
            .inc();
    }

    fn receive_remote(&self, topic: &str, bytes: &[u8]) {
        if !self.is_running() {
            debug!(topic, "Inbound message ignored: bus closed");
            return;
        }
        let event: CrossSystemEvent = match serde_json::from_slice(bytes) {
            Ok(event) => event,
            Err(e) => {
                warn!(topic, error = %e, "Undecodable inbound message dropped");
                return;
            }
        };
        let event = Arc::new(event);
        if !self.history.write().insert(Arc::clone(&event)) {
            log_bus_event!(debug, "Inbound echo ignored", event.id, event.kind);
            return;
        }
        self.record_accepted(&event);
        log_bus_event!(debug, "Inbound event queued", event.id, event.kind, source = %event.source);
        self.enqueue(Pending::new(event, Origin::Remote));
    }

    async fn process(&self, pending: Pending) {
        self.processed.fetch_add(1, Ordering::SeqCst);
        let event = Arc::clone(&pending.event);

        if event.is_expired(Utc::now()) {
            BUS_EVENTS_EXPIRED.inc();
            log_bus_event!(warn, "Expired event dropped", event.id, event.kind, source = %event.source);
            return;
        }

        let handlers = self.handlers.read().handlers_for(&event.kind);
        let mut failures: u32 = 0;

        for handler in handlers {
            let started = Instant::now();
            let outcome = AssertUnwindSafe(handler.handle(&event)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => {
                    BUS_EVENTS_DELIVERED.with_label_values(&[event.topic()]).inc();
                    if let Some(system) = handler.subscriber() {
                        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                        self.metrics.lock().record_received(system, elapsed_ms);
                    }
                }
                Ok(Err(e)) => {
                    failures += 1;
                    log_bus_event!(
                        warn,
                        "Handler failed",
                        event.id,
                        event.kind,
                        handler = handler.name(),
                        error = %e
                    );
                }
                Err(_) => {
                    failures += 1;
                    log_bus_event!(error, "Handler panicked", event.id, event.kind, handler = handler.name());
                }
            }
        }

        if pending.origin == Origin::Local {
            if let Err(e) = self.forward(&event).await {
                failures += 1;
                log_bus_event!(warn, "Transport forward failed", event.id, event.kind, error = %e);
            }
        }

        if failures > 0 {
            self.metrics.lock().record_failures(&event.source, failures);
            BUS_HANDLER_FAILURES
                .with_label_values(&[event.source.as_str()])
                .inc_by(f64::from(failures));
            self.retry_or_abandon(pending);
        }
    }

    async fn forward(&self, event: &CrossSystemEvent) -> Result<(), BusError> {
        let Some(transport) = &self.transport else {
            return Ok(());
        };
        let bytes =
            serde_json::to_vec(event).map_err(|e| BusError::Serialization(e.to_string()))?;
        transport.publish(event.topic(), bytes).await?;
        Ok(())
    }

    fn retry_or_abandon(&self, mut pending: Pending) {
        if !pending.event.retry_eligible() {
            return;
        }

        if pending.attempts >= self.config.max_retries {
            BUS_DEAD_LETTERS.inc();
            log_bus_event!(
                error,
                "Critical event abandoned after retries",
                pending.event.id,
                pending.event.kind,
                source = %pending.event.source,
                attempts = pending.attempts
            );
            self.dead_letters.lock().push(DeadLetter {
                event: (*pending.event).clone(),
                attempts: pending.attempts,
                abandoned_at: Utc::now(),
            });
            return;
        }

        let Some(bus) = self.self_ref.upgrade() else {
            return;
        };
        pending.attempts += 1;
        BUS_RETRIES.inc();
        self.inflight_retries.fetch_add(1, Ordering::SeqCst);
        log_bus_event!(
            info,
            "Critical event scheduled for retry",
            pending.event.id,
            pending.event.kind,
            attempt = pending.attempts
        );

        let delay = self.config.retry_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if bus.state.load(Ordering::SeqCst) == STOPPED {
                log_bus_event!(warn, "Retry dropped: bus stopped", pending.event.id, pending.event.kind);
            } else {
                bus.queue.lock().push_retry(pending);
                bus.update_depth();
            }
            bus.inflight_retries.fetch_sub(1, Ordering::SeqCst);
            bus.wakeup.notify_one();
        });
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: CrossSystemEvent) -> Result<EventId, BusError> {
        if !self.is_running() {
            return Err(BusError::Closed);
        }
        let event = Arc::new(event);
        let id = event.id;
        if !self.history.write().insert(Arc::clone(&event)) {
            log_bus_event!(warn, "Event id already in history, delivering again", id, event.kind);
        }
        self.record_accepted(&event);
        log_bus_event!(debug, "Event published", id, event.kind, source = %event.source, priority = %event.priority);
        self.enqueue(Pending::new(event, Origin::Local));
        Ok(id)
    }
}

/// Publisher that records events instead of delivering them.
///
/// Used by components under test that only need to observe what they emit.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<CrossSystemEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CrossSystemEvent> {
        self.events.lock().clone()
    }

    /// Recorded events of one kind.
    pub fn of_kind(&self, kind: &EventKind) -> Vec<CrossSystemEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| &event.kind == kind)
            .cloned()
            .collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: CrossSystemEvent) -> Result<EventId, BusError> {
        let id = event.id;
        self.events.lock().push(event);
        Ok(id)
    }
}
