//! # Core Domain Entities
//!
//! Defines the data model exchanged between the registry, the event bus,
//! the health monitor, the load balancer and the alert engine.
//!
//! ## Clusters
//!
//! - **Topology**: `ServiceDescriptor`, `EventKind`
//! - **Events**: `EventId`, `Priority`
//! - **Runtime**: `ServiceInstance`, `HealthRecord`, `IntegrationMetrics`
//! - **Alerting**: `Alert`, `AlertType`, `Severity`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Source name used for events emitted by the core itself.
pub const CORE_SOURCE: &str = "integration-core";

// =============================================================================
// CLUSTER A: TOPOLOGY
// =============================================================================

/// Typed event kind.
///
/// Built-in kinds carry the core's own lifecycle notifications; everything a
/// registered system declares in its contract is a `Custom` kind. Each kind
/// maps to exactly one topic string, which is also its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EventKind {
    /// A system finished registering with the core.
    RegistrationCompleted,
    /// The health monitor observed a status transition.
    HealthChanged,
    /// A system reports itself healthy.
    HealthOk,
    /// A system reports a failed health check.
    HealthFailed,
    /// A system reports a runtime error (degrades its health).
    SystemError,
    /// The alert engine raised an alert.
    Alert,
    /// An alert was explicitly resolved.
    AlertResolved,
    /// Domain event declared by a registered system.
    Custom(String),
}

impl EventKind {
    /// Topic string for this kind.
    #[must_use]
    pub fn topic(&self) -> &str {
        match self {
            Self::RegistrationCompleted => "integration.registration.completed",
            Self::HealthChanged => "integration.health.changed",
            Self::HealthOk => "integration.health.ok",
            Self::HealthFailed => "integration.health.failed",
            Self::SystemError => "integration.system.error",
            Self::Alert => "integration.alert",
            Self::AlertResolved => "integration.alert.resolved",
            Self::Custom(topic) => topic,
        }
    }

    /// Create a custom kind.
    pub fn custom(topic: impl Into<String>) -> Self {
        Self::from(topic.into())
    }

    /// Whether this kind is emitted by the core rather than a system contract.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

impl From<String> for EventKind {
    fn from(topic: String) -> Self {
        match topic.as_str() {
            "integration.registration.completed" => Self::RegistrationCompleted,
            "integration.health.changed" => Self::HealthChanged,
            "integration.health.ok" => Self::HealthOk,
            "integration.health.failed" => Self::HealthFailed,
            "integration.system.error" => Self::SystemError,
            "integration.alert" => Self::Alert,
            "integration.alert.resolved" => Self::AlertResolved,
            _ => Self::Custom(topic),
        }
    }
}

impl From<&str> for EventKind {
    fn from(topic: &str) -> Self {
        Self::from(topic.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Custom(topic) => topic,
            other => other.topic().to_string(),
        }
    }
}

impl FromStr for EventKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// A registered system's declared interface.
///
/// Immutable once registered; re-registering the same name replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique key.
    pub name: String,
    /// Deployed version.
    pub version: String,
    /// Event kinds this system emits.
    #[serde(default)]
    pub publishes: BTreeSet<EventKind>,
    /// Event kinds this system consumes.
    #[serde(default)]
    pub subscribes: BTreeSet<EventKind>,
    /// Names of systems this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ServiceDescriptor {
    /// Create a descriptor with no contract and no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".to_string(),
            publishes: BTreeSet::new(),
            subscribes: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Declare a published kind.
    pub fn publishes(mut self, kind: impl Into<EventKind>) -> Self {
        self.publishes.insert(kind.into());
        self
    }

    /// Declare a subscribed kind.
    pub fn subscribes(mut self, kind: impl Into<EventKind>) -> Self {
        self.subscribes.insert(kind.into());
        self
    }

    /// Declare a dependency. Duplicates are ignored.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }
}

// =============================================================================
// CLUSTER B: EVENTS
// =============================================================================

/// Globally unique event identifier.
///
/// Uses UUID v7 so identifiers are time-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generate a new identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Delivery priority.
///
/// Only `Critical` changes queue position; the other tiers share FIFO order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// =============================================================================
// CLUSTER C: RUNTIME STATE
// =============================================================================

/// A live instance of a registered system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Name of the system this instance belongs to.
    pub service_name: String,
    /// Host name or address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Connections currently routed to this instance.
    pub active_connections: u32,
    /// Result of the latest instance probe. New instances start healthy.
    pub healthy: bool,
}

impl ServiceInstance {
    /// Create a healthy instance with no active connections.
    pub fn new(service_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            host: host.into(),
            port,
            active_connections: 0,
            healthy: true,
        }
    }

    /// Set the healthy flag.
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// Set the connection count.
    pub fn with_connections(mut self, active_connections: u32) -> Self {
        self.active_connections = active_connections;
        self
    }

    /// `host:port` form.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether both values name the same endpoint of the same system.
    #[must_use]
    pub fn same_endpoint(&self, service_name: &str, host: &str, port: u16) -> bool {
        self.service_name == service_name && self.host == host && self.port == port
    }
}

/// Health status of a registered system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// Never checked.
    #[default]
    Unknown,
    /// Latest check passed.
    Healthy,
    /// Running, but an error signal was observed since the last check.
    Degraded,
    /// Latest check failed or timed out.
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

/// Health of one registered system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// The system this record describes.
    pub system_name: String,
    /// Current status.
    pub status: HealthStatus,
    /// When the latest check finished.
    pub last_check: Option<DateTime<Utc>>,
    /// Duration of the latest check in milliseconds.
    pub response_time_ms: u64,
    /// Status of each declared dependency, copied at the latest passing check.
    pub dependency_statuses: BTreeMap<String, HealthStatus>,
    /// Reason for the latest failure, if any.
    pub last_error: Option<String>,
}

impl HealthRecord {
    /// A record for a system that has never been checked.
    pub fn unknown(system_name: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
            status: HealthStatus::Unknown,
            last_check: None,
            response_time_ms: 0,
            dependency_statuses: BTreeMap::new(),
            last_error: None,
        }
    }
}

/// Per-system integration counters.
///
/// Monotonic for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationMetrics {
    /// Events this system published.
    pub events_published: u64,
    /// Events this system's handlers processed successfully.
    pub events_received: u64,
    /// Running mean handler time in milliseconds.
    pub average_response_time_ms: f64,
    /// Delivery failures attributed to events from this system.
    pub error_rate: f64,
}

impl IntegrationMetrics {
    /// Count one published event.
    pub fn record_published(&mut self) {
        self.events_published += 1;
    }

    /// Count one handled event and fold its duration into the mean.
    pub fn record_received(&mut self, response_time_ms: f64) {
        self.events_received += 1;
        let n = self.events_received as f64;
        self.average_response_time_ms += (response_time_ms - self.average_response_time_ms) / n;
    }

    /// Count one delivery failure.
    pub fn record_failure(&mut self) {
        self.error_rate += 1.0;
    }
}

// =============================================================================
// CLUSTER D: ALERTING
// =============================================================================

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Event priority used when an alert of this severity is published.
    #[must_use]
    pub fn priority(self) -> Priority {
        match self {
            Self::Low => Priority::Low,
            Self::Medium => Priority::Medium,
            Self::High => Priority::High,
            Self::Critical => Priority::Critical,
        }
    }
}

/// Condition that raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// The system's status is UNHEALTHY.
    SystemDown,
    /// The system's error rate crossed the threshold.
    HighErrorRate,
    /// A declared dependency is UNHEALTHY.
    DependencyFailure,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDown => write!(f, "SYSTEM_DOWN"),
            Self::HighErrorRate => write!(f, "HIGH_ERROR_RATE"),
            Self::DependencyFailure => write!(f, "DEPENDENCY_FAILURE"),
        }
    }
}

/// A raised alert. Never deleted; resolution is explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub system_name: String,
    /// The failing dependency, for `DependencyFailure` alerts.
    pub dependency: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create an open alert.
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        system_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            system_name: system_name.into(),
            dependency: None,
            message: message.into(),
            timestamp: Utc::now(),
            resolved: false,
            resolved_at: None,
        }
    }

    /// Attach the failing dependency.
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    /// Whether this alert describes the same open condition.
    #[must_use]
    pub fn same_condition(&self, alert_type: AlertType, system: &str, dependency: Option<&str>) -> bool {
        self.alert_type == alert_type
            && self.system_name == system
            && self.dependency.as_deref() == dependency
    }
}
