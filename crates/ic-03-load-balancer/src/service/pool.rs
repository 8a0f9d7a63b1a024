//! # Instance Pool
//!
//! Registered instances per service in registration order. The health
//! monitor flips `healthy`; callers routing traffic use `acquire` and
//! `release` to maintain `active_connections`.

use crate::error::SelectionError;
use crate::service::balancer::LoadBalancer;
use parking_lot::RwLock;
use shared_types::ServiceInstance;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct InstancePool {
    balancer: Arc<LoadBalancer>,
    services: RwLock<HashMap<String, Vec<ServiceInstance>>>,
}

impl InstancePool {
    pub fn new(balancer: Arc<LoadBalancer>) -> Self {
        Self {
            balancer,
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        &self.balancer
    }

    /// Add an instance. Returns false if the endpoint is already registered.
    pub fn register_instance(&self, instance: ServiceInstance) -> bool {
        let mut services = self.services.write();
        let entries = services.entry(instance.service_name.clone()).or_default();
        if entries
            .iter()
            .any(|e| e.same_endpoint(&instance.service_name, &instance.host, instance.port))
        {
            warn!(service = %instance.service_name, address = %instance.address(), "Instance already registered");
            return false;
        }
        info!(service = %instance.service_name, address = %instance.address(), "Instance registered");
        entries.push(instance);
        true
    }

    pub fn deregister_instance(&self, service: &str, host: &str, port: u16) -> Option<ServiceInstance> {
        let mut services = self.services.write();
        let entries = services.get_mut(service)?;
        let index = entries
            .iter()
            .position(|e| e.same_endpoint(service, host, port))?;
        let removed = entries.remove(index);
        if entries.is_empty() {
            services.remove(service);
        }
        info!(service, address = %removed.address(), "Instance deregistered");
        Some(removed)
    }

    /// Remove every instance of `service`.
    pub fn deregister_service(&self, service: &str) -> Vec<ServiceInstance> {
        let removed = self.services.write().remove(service).unwrap_or_default();
        if !removed.is_empty() {
            info!(service, count = removed.len(), "Service instances deregistered");
        }
        removed
    }

    /// Instances of `service` in registration order.
    pub fn instances(&self, service: &str) -> Vec<ServiceInstance> {
        self.services.read().get(service).cloned().unwrap_or_default()
    }

    /// Every instance of every service.
    pub fn all_instances(&self) -> Vec<ServiceInstance> {
        self.services.read().values().flatten().cloned().collect()
    }

    /// Set the healthy flag. Returns the previous value if the instance exists.
    pub fn set_healthy(&self, service: &str, host: &str, port: u16, healthy: bool) -> Option<bool> {
        self.update(service, host, port, |instance| {
            std::mem::replace(&mut instance.healthy, healthy)
        })
    }

    /// Count one more connection.
    pub fn acquire(&self, service: &str, host: &str, port: u16) -> Option<u32> {
        self.update(service, host, port, |instance| {
            instance.active_connections = instance.active_connections.saturating_add(1);
            instance.active_connections
        })
    }

    /// Count one fewer connection, never below zero.
    pub fn release(&self, service: &str, host: &str, port: u16) -> Option<u32> {
        self.update(service, host, port, |instance| {
            instance.active_connections = instance.active_connections.saturating_sub(1);
            instance.active_connections
        })
    }

    /// Select an instance of `service` and count a connection on it.
    pub fn select_from_pool(&self, service: &str) -> Result<ServiceInstance, SelectionError> {
        let candidates = self.instances(service);
        let mut chosen = self.balancer.select(service, &candidates)?;
        if let Some(connections) = self.acquire(service, &chosen.host, chosen.port) {
            chosen.active_connections = connections;
        }
        Ok(chosen)
    }

    fn update<T>(
        &self,
        service: &str,
        host: &str,
        port: u16,
        apply: impl FnOnce(&mut ServiceInstance) -> T,
    ) -> Option<T> {
        let mut services = self.services.write();
        services
            .get_mut(service)?
            .iter_mut()
            .find(|e| e.same_endpoint(service, host, port))
            .map(apply)
    }
}
