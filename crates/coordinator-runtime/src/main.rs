//! # Integration Core Runtime
//!
//! The main entry point for the integration coordinator.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load configuration (file in `IC_CONFIG`, then environment)
//! 3. Connect the transport and build components
//! 4. Register configured systems and validate the topology
//! 5. Start the bus and health loops
//! 6. Run until Ctrl+C, then drain and shut down

use std::sync::Arc;

use anyhow::{Context, Result};
use coordinator_runtime::{CoordinatorConfig, IntegrationCoordinator};
use integration_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use shared_bus::{InMemoryTransport, ShutdownMode};
use tracing::{debug, info, warn};

/// Log the startup order and every invalid integration.
fn report_topology(coordinator: &IntegrationCoordinator) {
    match coordinator.registry().init_order() {
        Ok(order) => info!(order = %order.join(" -> "), "Startup order resolved"),
        Err(e) => warn!(error = %e, "No startup order"),
    }

    for report in coordinator.validate_all() {
        if report.valid {
            debug!(system = %report.system, "Integration valid");
        } else {
            warn!(
                system = %report.system,
                issues = report.issues.len(),
                report = %report,
                "Integration invalid"
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Integration Core Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = CoordinatorConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let transport = Arc::new(InMemoryTransport::new());
    let coordinator = IntegrationCoordinator::new(config, transport, None)
        .await
        .context("Failed to build coordinator")?;

    report_topology(&coordinator);
    coordinator.start();

    info!("Coordinator is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    coordinator.shutdown(ShutdownMode::Drain).await;

    match encode_metrics() {
        Ok(metrics) => debug!(metrics = %metrics, "Final metrics"),
        Err(e) => warn!(error = %e, "Metrics not encoded"),
    }

    Ok(())
}
