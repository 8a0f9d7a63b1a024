//! Alert engine configuration.

use serde::{Deserialize, Serialize};

/// Default `error_rate` above which `HIGH_ERROR_RATE` is raised.
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Strictly greater error rates raise an alert.
    pub error_rate_threshold: f64,
    /// Skip raising an alert while an open one describes the same condition.
    pub dedupe_open_alerts: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
            dedupe_open_alerts: true,
        }
    }
}
