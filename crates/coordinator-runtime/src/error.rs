//! Runtime errors.

use crate::container::ConfigError;
use shared_bus::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The transport could not be connected. Startup cannot continue.
    #[error("Transport initialization failed: {0}")]
    TransportInit(#[source] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
