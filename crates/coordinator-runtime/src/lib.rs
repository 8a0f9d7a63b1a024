//! # Coordinator Runtime Library
//!
//! Builds the integration core from one configuration and exposes it
//! through [`IntegrationCoordinator`]. The main entry point is the
//! `main.rs` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and component construction
//! - `adapters/` - Port implementations (TCP health probe)
//! - `wiring/` - Bus subscriptions and the post-sweep alert scan
//! - `coordinator` - The coordination object other systems call
//!
//! ## Event Flow
//!
//! ```text
//! System ──publish──▶ Event Bus ──▶ Handlers
//!                        │  ▲
//!              forward   ▼  │ inbound
//!                      Transport
//!
//! Health loop ──sweep──▶ Monitor ──HealthChanged──▶ Event Bus
//!                          │
//!                          ▼
//!                     Alert Engine ──Alert──▶ Event Bus
//! ```

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod coordinator;
pub mod error;
pub mod wiring;

pub use container::{ConfigError, CoordinatorConfig};
pub use coordinator::{IntegrationCoordinator, MetricsView};
pub use error::CoordinatorError;
