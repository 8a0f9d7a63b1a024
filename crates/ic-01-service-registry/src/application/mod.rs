//! Application layer: registry and validator services.

pub mod registry;
pub mod validator;
