//! Error types for the alert engine

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("Alert {0} not found")]
    AlertNotFound(Uuid),
}
