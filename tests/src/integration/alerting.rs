//! # Alerting Scenarios
//!
//! Health sweeps feeding the alert engine, and alerts feeding back into
//! health.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ic_02_health_monitor::ProbeBehavior;
    use ic_04_alert_engine::FnAlertHandler;
    use parking_lot::Mutex;
    use shared_bus::{CrossSystemEvent, FnHandler, HandlerError, ShutdownMode};
    use shared_types::{Alert, AlertType, EventKind, HealthStatus, ServiceDescriptor, Severity};

    use crate::integration::support::{fast_config, harness, wait_until};

    #[tokio::test]
    async fn test_error_rate_alert_raised_once_and_resolved() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.register_system(ServiceDescriptor::new("S").publishes("s.work"));
        c.perform_health_check("S").await.unwrap();

        let notified = Arc::new(Mutex::new(Vec::<Alert>::new()));
        let sink = Arc::clone(&notified);
        c.subscribe_to_alerts(Arc::new(FnAlertHandler::new("collector", move |alert: &Alert| {
            sink.lock().push(alert.clone())
        })));
        c.subscribe_to_event(
            "s.work",
            Arc::new(FnHandler::new("broken-consumer", |_| Err(HandlerError::new("rejected")))),
        );

        for _ in 0..11 {
            c.publish_event(CrossSystemEvent::builder("S", "s.work").build())
                .unwrap();
        }
        c.bus().process_pending().await;
        assert!(c.bus().metrics("S").unwrap().error_rate > c.config().alerts.error_rate_threshold);

        let raised = c.run_sweep().await;
        assert_eq!(raised.len(), 1);
        let active = c.get_active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].alert_type, AlertType::HighErrorRate);
        assert_eq!(active[0].severity, Severity::High);
        assert_eq!(active[0].system_name, "S");
        assert_eq!(notified.lock().len(), 1);

        // Still above threshold, but the open alert is not raised again
        assert!(c.run_sweep().await.is_empty());
        assert_eq!(c.get_active_alerts().len(), 1);

        c.resolve_alert(active[0].id).unwrap();
        assert!(c.get_active_alerts().is_empty());
        assert_eq!(c.alerts().alert_history().len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_source_raises_no_alert() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.subscribe_to_event(
            "ghost.work",
            Arc::new(FnHandler::new("broken-consumer", |_| Err(HandlerError::new("rejected")))),
        );
        for _ in 0..11 {
            c.publish_event(CrossSystemEvent::builder("ghost", "ghost.work").build())
                .unwrap();
        }
        c.bus().process_pending().await;
        assert!(c.bus().metrics("ghost").unwrap().error_rate > c.config().alerts.error_rate_threshold);

        assert!(c.registry().is_empty());
        assert!(c.run_sweep().await.is_empty());
        assert!(c.get_active_alerts().is_empty());
    }

    #[tokio::test]
    async fn test_error_rate_alert_degrades_system() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.register_system(ServiceDescriptor::new("S"));
        c.perform_health_check("S").await.unwrap();
        c.subscribe_to_event(
            "s.work",
            Arc::new(FnHandler::new("broken-consumer", |_| Err(HandlerError::new("rejected")))),
        );
        for _ in 0..11 {
            c.publish_event(CrossSystemEvent::builder("S", "s.work").build())
                .unwrap();
        }
        c.bus().process_pending().await;

        c.run_sweep().await;
        // Deliver the Alert event to the health signal handler
        c.bus().process_pending().await;
        assert_eq!(c.get_system_health()["S"].status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_down_dependency_alerts_dependents() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.register_system(ServiceDescriptor::new("api").depends_on("db"));
        c.register_system(ServiceDescriptor::new("db"));
        h.probe.set("db", ProbeBehavior::Failing("connection refused".into()));

        let raised = c.run_sweep().await;
        let kinds: Vec<(AlertType, String, Option<String>)> = raised
            .iter()
            .map(|alert| (alert.alert_type, alert.system_name.clone(), alert.dependency.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (AlertType::DependencyFailure, "api".to_string(), Some("db".to_string())),
                (AlertType::SystemDown, "db".to_string(), None),
            ]
        );

        let alert_events = c
            .bus()
            .pending_ids()
            .into_iter()
            .filter_map(|id| c.bus().get_event(&id))
            .filter(|event| event.kind == EventKind::Alert)
            .count();
        assert_eq!(alert_events, 2);
        assert!(!c.validate_integration("api").valid);
    }

    #[tokio::test]
    async fn test_health_loop_runs_alert_scan() {
        let h = harness(fast_config()).await;
        let c = Arc::clone(&h.coordinator);
        c.register_system(ServiceDescriptor::new("db"));
        h.probe.set("db", ProbeBehavior::Hang);

        c.start();
        let watched = Arc::clone(&c);
        wait_until(move || !watched.get_active_alerts().is_empty()).await;
        c.shutdown(ShutdownMode::Drain).await;

        let health = c.get_system_health();
        let record = &health["db"];
        assert_eq!(record.status, HealthStatus::Unhealthy);
        assert_eq!(record.last_error.as_deref(), Some("timeout"));
        assert_eq!(c.get_active_alerts()[0].alert_type, AlertType::SystemDown);
    }
}
