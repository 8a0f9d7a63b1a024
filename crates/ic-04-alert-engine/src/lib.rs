//! # IC-04: Alert Engine
//!
//! Scans the health snapshot and per-system metrics after every sweep and
//! raises alerts for systems that are down, failing too often, or depending
//! on something that is down.
//!
//! | Alert | Severity | Condition |
//! |-------|----------|-----------|
//! | `SYSTEM_DOWN` | critical | system is UNHEALTHY |
//! | `HIGH_ERROR_RATE` | high | `error_rate > error_rate_threshold` |
//! | `DEPENDENCY_FAILURE` | high | one per UNHEALTHY dependency |
//!
//! Alerts are only resolved explicitly through [`AlertEngine::resolve_alert`].

pub mod config;
pub mod engine;
pub mod error;
pub mod subscriber;

pub use config::AlertConfig;
pub use engine::AlertEngine;
pub use error::AlertError;
pub use subscriber::{AlertHandler, FnAlertHandler};
