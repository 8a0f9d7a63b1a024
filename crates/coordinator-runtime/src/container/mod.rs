//! # Component Container
//!
//! Configuration and construction of the integration core components.
//!
//! ## Construction Order
//!
//! ```text
//! Transport → Event Bus → Registry → Load Balancer/Pool → Health Monitor
//!           → Dependency Validator → Alert Engine
//! ```

pub mod components;
pub mod config;

pub use components::Components;
pub use config::{
    BalancerSection, BusSection, ConfigError, CoordinatorConfig, HealthSection, SystemConfig,
    TransportSection,
};
