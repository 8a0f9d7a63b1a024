//! Domain layer: graph model, reports and errors.

pub mod errors;
pub mod graph;
pub mod report;
