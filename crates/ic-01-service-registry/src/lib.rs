//! # IC-01: Service Registry
//!
//! Holds the declared interface of every registered system and validates
//! the resulting topology.
//!
//! ## Architecture
//!
//! - **Domain**: `DependencyGraph`, `ValidationReport`, `RegistryError`
//! - **Algorithms**: DFS cycle detection, Kahn's start-up ordering
//! - **Ports**: Outbound (`HealthLookup`)
//! - **Application**: `ServiceRegistry`, `DependencyValidator`
//!
//! Registration never fails: a descriptor that closes a cycle is stored,
//! logged as a topology error, and reported by validation.

pub mod algorithms;
pub mod application;
pub mod domain;
pub mod ports;

pub use application::registry::{RegistrationReceipt, ServiceRegistry};
pub use application::validator::DependencyValidator;
pub use domain::errors::RegistryError;
pub use domain::graph::DependencyGraph;
pub use domain::report::ValidationReport;
pub use ports::outbound::HealthLookup;
