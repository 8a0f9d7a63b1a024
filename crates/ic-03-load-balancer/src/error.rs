//! Error types for instance selection

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No instance available for '{service}'")]
    NoInstanceAvailable { service: String },

    #[error("No healthy instance available for '{service}'")]
    NoHealthyInstance { service: String },

    #[error("Unknown load-balancing strategy: '{0}'")]
    UnknownStrategy(String),
}
