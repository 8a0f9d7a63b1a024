//! # Coordinator Configuration
//!
//! Unified configuration for every component of the integration core.
//!
//! Loaded from a TOML file (path in `IC_CONFIG`) and then overridden from
//! the environment. Every section has defaults, so an empty file is valid.
//!
//! ```toml
//! [health]
//! check_interval_secs = 10
//!
//! [[systems]]
//! name = "orders"
//! publishes = ["orders.created"]
//! dependencies = ["inventory"]
//! instances = ["10.0.0.5:8080"]
//! ```

use ic_02_health_monitor::HealthMonitorConfig;
use ic_03_load_balancer::Strategy;
use ic_04_alert_engine::AlertConfig;
use serde::{Deserialize, Serialize};
use shared_bus::{BusConfig, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use shared_types::{ServiceDescriptor, ServiceInstance};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable holding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "IC_CONFIG";

/// Complete coordinator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub bus: BusSection,
    pub health: HealthSection,
    pub alerts: AlertConfig,
    pub balancer: BalancerSection,
    pub transport: TransportSection,
    /// Systems registered at startup.
    pub systems: Vec<SystemConfig>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSection {
    /// Events retained for lookups and correlation.
    pub history_capacity: usize,
    /// Delay before a failed critical event is re-queued.
    pub retry_delay_ms: u64,
    /// Re-attempts before a critical event becomes a dead letter.
    pub max_retries: u32,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BusSection {
    pub fn to_bus_config(&self) -> BusConfig {
        BusConfig {
            history_capacity: self.history_capacity,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retries: self.max_retries,
        }
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    pub check_interval_secs: u64,
    pub check_timeout_ms: u64,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            check_timeout_ms: 5_000,
        }
    }
}

impl HealthSection {
    pub fn to_monitor_config(&self) -> HealthMonitorConfig {
        HealthMonitorConfig {
            check_interval: Duration::from_secs(self.check_interval_secs),
            check_timeout: Duration::from_millis(self.check_timeout_ms),
        }
    }
}

/// Load balancer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerSection {
    /// One of `round-robin`, `random`, `least-connections`, `health-based`.
    pub strategy: String,
}

impl Default for BalancerSection {
    fn default() -> Self {
        Self {
            strategy: Strategy::default().as_str().to_string(),
        }
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// Topics whose messages are fed into the local bus.
    pub inbound_topics: Vec<String>,
}

/// One system registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub publishes: Vec<String>,
    #[serde(default)]
    pub subscribes: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Endpoints as `host:port`.
    #[serde(default)]
    pub instances: Vec<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl SystemConfig {
    pub fn descriptor(&self) -> ServiceDescriptor {
        let mut descriptor = ServiceDescriptor::new(&self.name).with_version(&self.version);
        for kind in &self.publishes {
            descriptor = descriptor.publishes(kind.as_str());
        }
        for kind in &self.subscribes {
            descriptor = descriptor.subscribes(kind.as_str());
        }
        for dependency in &self.dependencies {
            descriptor = descriptor.depends_on(dependency);
        }
        descriptor
    }

    /// Parse the configured endpoints.
    pub fn instances(&self) -> Result<Vec<ServiceInstance>, ConfigError> {
        self.instances
            .iter()
            .map(|address| parse_endpoint(&self.name, address))
            .collect()
    }
}

fn parse_endpoint(service: &str, address: &str) -> Result<ServiceInstance, ConfigError> {
    let invalid = || ConfigError::Invalid(format!("system '{service}': bad instance address '{address}'"));
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    let port: u16 = port.parse().map_err(|_| invalid())?;
    Ok(ServiceInstance::new(service, host, port))
}

impl CoordinatorConfig {
    /// Parse a TOML document.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&source)?;
        info!(path = %path.display(), systems = config.systems.len(), "Configuration loaded");
        Ok(config)
    }

    /// Load from `IC_CONFIG` if set, else defaults, then apply environment
    /// overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `IC_HEALTH_INTERVAL_SECS`, `IC_ERROR_RATE_THRESHOLD` and
    /// `IC_LB_STRATEGY` from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("IC_HEALTH_INTERVAL_SECS") {
            match value.parse() {
                Ok(secs) => self.health.check_interval_secs = secs,
                Err(_) => warn!(value = %value, "IC_HEALTH_INTERVAL_SECS must be an integer"),
            }
        }
        if let Some(value) = lookup("IC_ERROR_RATE_THRESHOLD") {
            match value.parse() {
                Ok(threshold) => self.alerts.error_rate_threshold = threshold,
                Err(_) => warn!(value = %value, "IC_ERROR_RATE_THRESHOLD must be a number"),
            }
        }
        if let Some(value) = lookup("IC_LB_STRATEGY") {
            self.balancer.strategy = value;
        }
    }

    /// Reject configurations the components cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.history_capacity == 0 {
            return Err(ConfigError::Invalid("bus.history_capacity must be > 0".into()));
        }
        if self.health.check_interval_secs == 0 {
            return Err(ConfigError::Invalid("health.check_interval_secs must be > 0".into()));
        }
        if self.health.check_timeout_ms == 0 {
            return Err(ConfigError::Invalid("health.check_timeout_ms must be > 0".into()));
        }
        let threshold = self.alerts.error_rate_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "alerts.error_rate_threshold must be a non-negative number, got {threshold}"
            )));
        }
        self.strategy()?;

        let mut names = HashSet::new();
        for system in &self.systems {
            if system.name.trim().is_empty() {
                return Err(ConfigError::Invalid("system name must not be empty".into()));
            }
            if !names.insert(system.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate system '{}'", system.name)));
            }
            system.instances()?;
        }
        Ok(())
    }

    /// The configured load-balancing strategy.
    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        self.balancer
            .strategy
            .parse()
            .map_err(|e: ic_03_load_balancer::SelectionError| ConfigError::Invalid(e.to_string()))
    }
}
