//! Graph algorithms over the dependency graph.

pub mod cycles;
pub mod kahns;

pub use cycles::{cycles_involving, find_cycles};
pub use kahns::startup_order;
