//! # Components
//!
//! Builds and holds every component instance with its dependencies
//! injected.
//!
//! ## Thread Safety
//!
//! - All components are wrapped in `Arc` for shared ownership
//! - Components guard their own state; the container itself is immutable

use std::sync::Arc;

use ic_01_service_registry::{DependencyValidator, ServiceRegistry};
use ic_02_health_monitor::{HealthMonitor, HealthProbe};
use ic_03_load_balancer::{InstancePool, LoadBalancer, Strategy};
use ic_04_alert_engine::AlertEngine;
use shared_bus::{EventBus, EventPublisher, Transport};
use tracing::{info, warn};

use crate::adapters::TcpConnectProbe;
use crate::container::config::CoordinatorConfig;
use crate::error::CoordinatorError;

pub struct Components {
    pub transport: Arc<dyn Transport>,
    pub bus: Arc<EventBus>,
    pub registry: Arc<ServiceRegistry>,
    pub pool: Arc<InstancePool>,
    pub monitor: Arc<HealthMonitor>,
    pub validator: DependencyValidator,
    pub alerts: Arc<AlertEngine>,
}

impl Components {
    /// Connect the transport and build every component.
    ///
    /// `probe` defaults to TCP connects against pooled instances. Only a
    /// transport connect failure is an error; inbound topics that cannot be
    /// attached are logged and skipped.
    pub async fn build(
        config: &CoordinatorConfig,
        transport: Arc<dyn Transport>,
        probe: Option<Arc<dyn HealthProbe>>,
    ) -> Result<Self, CoordinatorError> {
        transport
            .connect()
            .await
            .map_err(CoordinatorError::TransportInit)?;
        info!("Transport connected");

        let bus = EventBus::with_transport(config.bus.to_bus_config(), Arc::clone(&transport));
        for topic in &config.transport.inbound_topics {
            if let Err(e) = bus.attach_inbound(topic).await {
                warn!(topic = %topic, error = %e, "Inbound topic not attached");
            }
        }
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let registry = Arc::new(ServiceRegistry::new(Arc::clone(&publisher)));

        let strategy = config.strategy().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default load-balancing strategy");
            Strategy::default()
        });
        let pool = Arc::new(InstancePool::new(Arc::new(LoadBalancer::new(strategy))));

        let probe = probe.unwrap_or_else(|| Arc::new(TcpConnectProbe::new(Arc::clone(&pool))));
        let monitor = Arc::new(
            HealthMonitor::new(
                Arc::clone(&registry),
                probe,
                Arc::clone(&publisher),
                config.health.to_monitor_config(),
            )
            .with_pool(Arc::clone(&pool)),
        );

        let validator = DependencyValidator::new(Arc::clone(&registry), monitor.clone());
        let alerts = Arc::new(AlertEngine::new(publisher, config.alerts.clone()));

        info!(strategy = %strategy, "Components initialized");
        Ok(Self {
            transport,
            bus,
            registry,
            pool,
            monitor,
            validator,
            alerts,
        })
    }
}
