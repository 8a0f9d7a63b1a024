//! # Cross-System Events
//!
//! Defines the event envelope routed by the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{EventId, EventKind, Priority};

/// An event published by one system for consumption by others.
///
/// Immutable after creation; the bus shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSystemEvent {
    /// Globally unique id.
    pub id: EventId,
    /// Name of the publishing system.
    pub source: String,
    /// Typed event kind; also selects the transport topic.
    pub kind: EventKind,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Delivery priority.
    pub priority: Priority,
    /// Whether a failed critical delivery is retried.
    pub retryable: bool,
    /// Groups related events into a chain.
    pub correlation_id: Option<String>,
    /// The event is dropped if still queued past this instant.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CrossSystemEvent {
    /// Start building an event.
    pub fn builder(source: impl Into<String>, kind: impl Into<EventKind>) -> EventBuilder {
        EventBuilder {
            source: source.into(),
            kind: kind.into(),
            payload: serde_json::Value::Null,
            priority: Priority::default(),
            retryable: true,
            correlation_id: None,
            expires_at: None,
        }
    }

    /// Topic this event is forwarded on.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.kind.topic()
    }

    /// Whether the event has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Whether a failed delivery of this event is retried.
    #[must_use]
    pub fn retry_eligible(&self) -> bool {
        self.retryable && self.priority == Priority::Critical
    }
}

/// Builder for [`CrossSystemEvent`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
    source: String,
    kind: EventKind,
    payload: serde_json::Value,
    priority: Priority,
    retryable: bool,
    correlation_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl EventBuilder {
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Finish the event, assigning a fresh id and timestamp.
    #[must_use]
    pub fn build(self) -> CrossSystemEvent {
        CrossSystemEvent {
            id: EventId::new(),
            source: self.source,
            kind: self.kind,
            payload: self.payload,
            timestamp: Utc::now(),
            priority: self.priority,
            retryable: self.retryable,
            correlation_id: self.correlation_id,
            expires_at: self.expires_at,
        }
    }
}
