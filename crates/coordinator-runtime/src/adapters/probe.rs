//! TCP connect health probe.

use async_trait::async_trait;
use ic_02_health_monitor::{HealthError, HealthProbe};
use ic_03_load_balancer::InstancePool;
use shared_types::{ServiceDescriptor, ServiceInstance};
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::debug;

/// Treats an endpoint as alive if a TCP connection to it can be opened.
///
/// A system is healthy if any of its pooled instances accepts a connection.
/// Systems without pooled instances have nothing to reach and pass.
pub struct TcpConnectProbe {
    pool: Arc<InstancePool>,
}

impl TcpConnectProbe {
    pub fn new(pool: Arc<InstancePool>) -> Self {
        Self { pool }
    }

    async fn connect(address: &str) -> bool {
        match TcpStream::connect(address).await {
            Ok(_) => true,
            Err(e) => {
                debug!(address, error = %e, "TCP probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl HealthProbe for TcpConnectProbe {
    async fn check(&self, descriptor: &ServiceDescriptor) -> Result<(), HealthError> {
        let instances = self.pool.instances(&descriptor.name);
        if instances.is_empty() {
            return Ok(());
        }
        for instance in &instances {
            if Self::connect(&instance.address()).await {
                return Ok(());
            }
        }
        Err(HealthError::ProbeFailed(format!(
            "none of {} instances accepted a connection",
            instances.len()
        )))
    }

    async fn probe_instance(&self, instance: &ServiceInstance) -> bool {
        Self::connect(&instance.address()).await
    }
}
