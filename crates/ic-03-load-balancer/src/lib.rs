//! # IC-03 Load Balancer
//!
//! Chooses one instance of a service per request.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `Strategy` and its parsing rules
//! - **Service Layer** (`service/`):
//!   - `LoadBalancer`: stateless selection over a caller-supplied slice,
//!     with a per-service rotation cursor
//!   - `InstancePool`: registered instances, health flags and connection
//!     counters, with `select_from_pool` convenience
//!
//! ## Strategies
//!
//! | Name | Rule |
//! |------|------|
//! | `round-robin` | rotating index per service |
//! | `random` | uniform choice |
//! | `least-connections` | lowest `active_connections`, first wins ties |
//! | `health-based` | round-robin over healthy instances only (default) |
//!
//! Selection never panics: an empty slice is `NoInstanceAvailable`, and
//! `health-based` with no healthy instance is `NoHealthyInstance`.

pub mod domain;
pub mod error;
pub mod service;

pub use domain::strategy::Strategy;
pub use error::SelectionError;
pub use service::{InstancePool, LoadBalancer};
