//! # Load Balancer
//!
//! Stateless except for one rotation cursor per service and the globally
//! active strategy.

use crate::domain::strategy::Strategy;
use crate::error::SelectionError;
use integration_telemetry::LB_SELECTIONS;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use shared_types::ServiceInstance;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct LoadBalancer {
    strategy: RwLock<Strategy>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl LoadBalancer {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy: RwLock::new(strategy),
            cursors: Mutex::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> Strategy {
        *self.strategy.read()
    }

    /// Change the active strategy by name. Unknown names leave it unchanged.
    pub fn set_strategy(&self, name: &str) -> Result<Strategy, SelectionError> {
        let strategy: Strategy = name.parse()?;
        let previous = std::mem::replace(&mut *self.strategy.write(), strategy);
        info!(from = %previous, to = %strategy, "Load-balancing strategy changed");
        Ok(strategy)
    }

    /// Choose one instance of `service` from `instances`.
    pub fn select(
        &self,
        service: &str,
        instances: &[ServiceInstance],
    ) -> Result<ServiceInstance, SelectionError> {
        let strategy = self.strategy();
        let outcome = self.select_with(strategy, service, instances);
        let label = if outcome.is_ok() { "selected" } else { "none" };
        LB_SELECTIONS
            .with_label_values(&[strategy.as_str(), label])
            .inc();
        if let Ok(instance) = &outcome {
            debug!(service, strategy = %strategy, address = %instance.address(), "Instance selected");
        }
        outcome
    }

    fn select_with(
        &self,
        strategy: Strategy,
        service: &str,
        instances: &[ServiceInstance],
    ) -> Result<ServiceInstance, SelectionError> {
        if instances.is_empty() {
            return Err(SelectionError::NoInstanceAvailable {
                service: service.to_string(),
            });
        }

        match strategy {
            Strategy::RoundRobin => Ok(self.rotate(service, instances).clone()),
            Strategy::Random => {
                let index = rand::thread_rng().gen_range(0..instances.len());
                Ok(instances[index].clone())
            }
            Strategy::LeastConnections => instances
                .iter()
                .min_by_key(|instance| instance.active_connections)
                .cloned()
                .ok_or_else(|| SelectionError::NoInstanceAvailable {
                    service: service.to_string(),
                }),
            Strategy::HealthBased => {
                let healthy: Vec<ServiceInstance> = instances
                    .iter()
                    .filter(|instance| instance.healthy)
                    .cloned()
                    .collect();
                if healthy.is_empty() {
                    return Err(SelectionError::NoHealthyInstance {
                        service: service.to_string(),
                    });
                }
                Ok(self.rotate(service, &healthy).clone())
            }
        }
    }

    /// Return `cursor mod N`, then advance the cursor.
    fn rotate<'a>(&self, service: &str, instances: &'a [ServiceInstance]) -> &'a ServiceInstance {
        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(service.to_string()).or_insert(0);
        let index = *cursor % instances.len();
        *cursor = cursor.wrapping_add(1);
        &instances[index]
    }
}
