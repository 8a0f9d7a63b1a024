//! # Shared Types Crate
//!
//! This crate contains the domain entities and error types shared by every
//! component of the integration core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-component types are defined here.
//! - **Typed Events**: Event kinds are an enum with a `Custom` escape hatch;
//!   the topic string is derived from the kind, never chosen separately.
//! - **No Behaviour**: Types here carry data and small helpers only. State
//!   machines and policies live in the component crates.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
