//! # Event Subscriber
//!
//! Defines the handler side of the event bus and the registry that keeps
//! handlers in registration order.

use crate::events::CrossSystemEvent;
use async_trait::async_trait;
use shared_types::EventKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a handler that failed to process an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A consumer of bus events.
///
/// Handlers run sequentially on the bus task, so they should return quickly
/// and must tolerate duplicate delivery of retried critical events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one event.
    async fn handle(&self, event: &CrossSystemEvent) -> Result<(), HandlerError>;

    /// Name used in logs.
    fn name(&self) -> &str;

    /// Registered system this handler receives on behalf of.
    ///
    /// When set, successful deliveries count towards that system's
    /// `events_received` and response time.
    fn subscriber(&self) -> Option<&str> {
        None
    }
}

type SyncHandlerFn = dyn Fn(&CrossSystemEvent) -> Result<(), HandlerError> + Send + Sync;

/// Adapts a synchronous closure into an [`EventHandler`].
pub struct FnHandler {
    name: String,
    subscriber: Option<String>,
    func: Box<SyncHandlerFn>,
}

impl FnHandler {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&CrossSystemEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            subscriber: None,
            func: Box::new(func),
        }
    }

    /// Attribute successful deliveries to a registered system.
    pub fn for_subscriber(mut self, system: impl Into<String>) -> Self {
        self.subscriber = Some(system.into());
        self
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventHandler for FnHandler {
    async fn handle(&self, event: &CrossSystemEvent) -> Result<(), HandlerError> {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn subscriber(&self) -> Option<&str> {
        self.subscriber.as_deref()
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

/// Handlers keyed by event kind plus one wildcard bucket.
///
/// Every subscription takes a sequence number from one shared counter;
/// `handlers_for` merges the kind bucket with the wildcard bucket by that
/// number, so handlers run in registration order across both.
#[derive(Default)]
pub struct HandlerRegistry {
    next_seq: u64,
    by_kind: HashMap<EventKind, Vec<Entry>>,
    wildcard: Vec<Entry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to one kind.
    pub fn subscribe(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = self.next_id();
        self.by_kind.entry(kind).or_default().push(Entry { id, handler });
        id
    }

    /// Subscribe a handler to every kind.
    pub fn subscribe_all(&mut self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = self.next_id();
        self.wildcard.push(Entry { id, handler });
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.len();
        self.wildcard.retain(|entry| entry.id != id);
        for entries in self.by_kind.values_mut() {
            entries.retain(|entry| entry.id != id);
        }
        self.by_kind.retain(|_, entries| !entries.is_empty());
        self.len() != before
    }

    /// Handlers that receive `kind`, in registration order.
    pub fn handlers_for(&self, kind: &EventKind) -> Vec<Arc<dyn EventHandler>> {
        let specific = self.by_kind.get(kind).map(Vec::as_slice).unwrap_or_default();
        let mut merged: Vec<&Entry> = specific.iter().chain(self.wildcard.iter()).collect();
        merged.sort_by_key(|entry| entry.id.0);
        merged.into_iter().map(|entry| Arc::clone(&entry.handler)).collect()
    }

    /// Total number of subscriptions.
    pub fn len(&self) -> usize {
        self.wildcard.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_seq += 1;
        SubscriptionId(self.next_seq)
    }
}
