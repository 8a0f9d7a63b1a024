//! # Shared Bus - Prioritized Event Bus
//!
//! Routes `CrossSystemEvent`s between registered systems.
//!
//! ## Delivery Rules
//!
//! - Publishing only enqueues; one worker task delivers strictly in order
//! - Critical events wait in their own tier and are delivered first
//! - Handlers run in registration order; a failing or panicking handler is
//!   isolated and attributed to the source system's `error_rate`
//! - Failed retryable critical events are re-queued up to `max_retries`
//!   times, then kept as dead letters
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   handle()   ┌──────────────┐
//! │  System A    │ ────────────▶ │  Event Bus   │ ───────────▶ │  Handlers    │
//! └──────────────┘               │  (2-tier Q)  │              └──────────────┘
//!                                │              │   publish()  ┌──────────────┐
//!                                │              │ ───────────▶ │  Transport   │
//!                                └──────────────┘ ◀─────────── └──────────────┘
//!                                                 attach_inbound()
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod history;
pub mod metrics;
pub mod publisher;
pub mod queue;
pub mod subscriber;
pub mod transport;

// Re-export main types
pub use events::{CrossSystemEvent, EventBuilder};
pub use publisher::{
    BusConfig, BusError, DeadLetter, EventBus, EventPublisher, RecordingPublisher, ShutdownMode,
};
pub use queue::Origin;
pub use shared_types::CORE_SOURCE;
pub use subscriber::{EventHandler, FnHandler, HandlerError, HandlerRegistry, SubscriptionId};
pub use transport::{InMemoryTransport, Transport, TransportCallback, TransportError};

/// Events retained in history by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// Default delay before a failed critical event is re-queued.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Default number of re-attempts for a failed critical event.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
