//! # Service Registry
//!
//! Owns every registered `ServiceDescriptor`. Registration order is kept so
//! listings and graph traversals are stable.

use crate::algorithms::{cycles_involving, startup_order};
use crate::domain::errors::RegistryError;
use crate::domain::graph::DependencyGraph;
use parking_lot::RwLock;
use shared_bus::{CrossSystemEvent, EventPublisher, CORE_SOURCE};
use shared_types::{EventId, EventKind, ServiceDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a registration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    /// A descriptor with the same name was overwritten.
    pub replaced: bool,
    /// Id of the `RegistrationCompleted` event, if the bus accepted it.
    pub event_id: Option<EventId>,
}

#[derive(Default)]
struct RegistryState {
    descriptors: HashMap<String, ServiceDescriptor>,
    order: Vec<String>,
}

impl RegistryState {
    fn ordered(&self) -> Vec<ServiceDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.descriptors.get(name).cloned())
            .collect()
    }

    fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_descriptors(
            self.order.iter().filter_map(|name| self.descriptors.get(name)),
        )
    }
}

pub struct ServiceRegistry {
    state: RwLock<RegistryState>,
    publisher: Arc<dyn EventPublisher>,
}

impl ServiceRegistry {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            publisher,
        }
    }

    /// Store or overwrite a descriptor and announce it on the bus.
    ///
    /// Never fails. A registration that closes a dependency cycle is stored
    /// anyway and logged as a topology error.
    pub fn register(&self, descriptor: ServiceDescriptor) -> RegistrationReceipt {
        let name = descriptor.name.clone();
        let version = descriptor.version.clone();

        let (replaced, cycles) = {
            let mut state = self.state.write();
            let replaced = state.descriptors.insert(name.clone(), descriptor).is_some();
            if !replaced {
                state.order.push(name.clone());
            }
            let cycles = cycles_involving(&state.graph(), &name);
            (replaced, cycles)
        };

        if replaced {
            warn!(system = %name, version = %version, "Topology change: descriptor replaced");
        } else {
            info!(system = %name, version = %version, "System registered");
        }
        for cycle in &cycles {
            warn!(system = %name, cycle = %cycle.join(" -> "), "Topology error: circular dependency");
        }

        let event = CrossSystemEvent::builder(CORE_SOURCE, EventKind::RegistrationCompleted)
            .payload(serde_json::json!({
                "name": name,
                "version": version,
                "replaced": replaced,
            }))
            .build();
        let event_id = match self.publisher.publish(event) {
            Ok(id) => Some(id),
            Err(e) => {
                error!(system = %name, error = %e, "Failed to announce registration");
                None
            }
        };

        RegistrationReceipt { replaced, event_id }
    }

    /// Remove a descriptor.
    pub fn deregister(&self, name: &str) -> Result<ServiceDescriptor, RegistryError> {
        let mut state = self.state.write();
        let removed = state
            .descriptors
            .remove(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        state.order.retain(|entry| entry != name);
        info!(system = %name, "System deregistered");
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<ServiceDescriptor> {
        self.state.read().descriptors.get(name).cloned()
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> Vec<ServiceDescriptor> {
        self.state.read().ordered()
    }

    /// Declared dependencies, or `None` if `name` is not registered.
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .descriptors
            .get(name)
            .map(|descriptor| descriptor.dependencies.clone())
    }

    /// Declared dependencies of every registered system.
    pub fn dependency_map(&self) -> HashMap<String, Vec<String>> {
        self.state
            .read()
            .descriptors
            .iter()
            .map(|(name, descriptor)| (name.clone(), descriptor.dependencies.clone()))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().descriptors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered systems that declare `kind` in `publishes`.
    pub fn publishers_of(&self, kind: &EventKind) -> Vec<String> {
        self.list()
            .into_iter()
            .filter(|descriptor| descriptor.publishes.contains(kind))
            .map(|descriptor| descriptor.name)
            .collect()
    }

    /// Registered systems that depend on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.graph().dependents_of(name)
    }

    /// Current dependency graph.
    pub fn graph(&self) -> DependencyGraph {
        self.state.read().graph()
    }

    /// Start-up order, dependencies first.
    pub fn init_order(&self) -> Result<Vec<String>, RegistryError> {
        startup_order(&self.graph())
    }
}
