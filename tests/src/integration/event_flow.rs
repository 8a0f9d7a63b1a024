//! # Event Flow Scenarios
//!
//! Ordering, handler isolation, retries and correlation on the event bus.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use shared_bus::{
        BusConfig, CrossSystemEvent, EventBus, EventHandler, EventPublisher, FnHandler,
        HandlerError, ShutdownMode,
    };
    use shared_types::{EventId, EventKind, Priority};

    use crate::integration::support::{fast_config, harness, wait_until};

    fn bus() -> Arc<EventBus> {
        EventBus::new(BusConfig {
            retry_delay: Duration::from_millis(1),
            ..BusConfig::default()
        })
    }

    fn recorder(log: &Arc<Mutex<Vec<EventId>>>) -> Arc<dyn EventHandler> {
        let log = Arc::clone(log);
        Arc::new(FnHandler::new("recorder", move |event| {
            log.lock().push(event.id);
            Ok(())
        }))
    }

    #[tokio::test]
    async fn test_critical_overtakes_pending_mediums() {
        const N: usize = 25;
        let bus = bus();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_all(recorder(&delivered));

        let mediums: Vec<EventId> = (0..N)
            .map(|i| {
                bus.publish(
                    CrossSystemEvent::builder("orders", "orders.created")
                        .payload(serde_json::json!({ "seq": i }))
                        .build(),
                )
                .unwrap()
            })
            .collect();
        let critical = bus
            .publish(
                CrossSystemEvent::builder("orders", "orders.failed")
                    .priority(Priority::Critical)
                    .build(),
            )
            .unwrap();

        assert_eq!(bus.process_pending().await, N + 1);
        let delivered = delivered.lock().clone();
        assert_eq!(delivered[0], critical);
        assert_eq!(&delivered[1..], mediums.as_slice());
    }

    #[tokio::test]
    async fn test_throwing_handler_does_not_block_others() {
        let bus = bus();
        let kind = EventKind::custom("inventory.reserved");
        let delivered = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(
            kind.clone(),
            Arc::new(FnHandler::new("always-throws", |_| Err(HandlerError::new("boom")))),
        );
        bus.subscribe(kind.clone(), recorder(&delivered));

        let ids: Vec<EventId> = (0..3)
            .map(|_| {
                bus.publish(CrossSystemEvent::builder("inventory", kind.clone()).build())
                    .unwrap()
            })
            .collect();
        bus.process_pending().await;

        assert_eq!(*delivered.lock(), ids);
        let metrics = bus.metrics("inventory").unwrap();
        assert_eq!(metrics.events_published, 3);
        assert!((metrics.error_rate - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_correlation_returns_exact_chain_in_publish_order() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;

        let mut chain = Vec::new();
        for step in ["order.placed", "payment.taken", "order.shipped"] {
            chain.push(
                c.publish_event(
                    CrossSystemEvent::builder("orders", step)
                        .correlation_id("order-42")
                        .build(),
                )
                .unwrap(),
            );
            c.publish_event(
                CrossSystemEvent::builder("orders", step)
                    .correlation_id("order-43")
                    .build(),
            )
            .unwrap();
            c.publish_event(CrossSystemEvent::builder("orders", step).build())
                .unwrap();
        }

        assert_eq!(c.get_event_correlation("order-42"), chain);
        assert_eq!(c.get_event_correlation("order-43").len(), 3);
        assert!(c.get_event_correlation("order-44").is_empty());
    }

    #[tokio::test]
    async fn test_failing_critical_event_is_retried() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        c.subscribe_to_event(
            "x",
            Arc::new(FnHandler::new("always-throws", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(HandlerError::new("unavailable"))
            })),
        );
        c.start();

        let id = c
            .publish_event(
                CrossSystemEvent::builder("producer", "x")
                    .priority(Priority::Critical)
                    .retryable(true)
                    .build(),
            )
            .unwrap();

        let bus = Arc::clone(c.bus());
        wait_until(move || !bus.dead_letters().is_empty()).await;

        assert!(attempts.load(Ordering::SeqCst) >= 2);
        let dead = c.bus().dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].event.id, id);
        assert_eq!(dead[0].attempts, c.config().bus.max_retries);

        c.shutdown(ShutdownMode::Drain).await;
    }

    #[tokio::test]
    async fn test_critical_retry_can_succeed() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        c.subscribe_to_event(
            "x",
            Arc::new(FnHandler::new("flaky", move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(HandlerError::new("first call fails"))
                } else {
                    Ok(())
                }
            })),
        );
        c.start();
        c.publish_event(
            CrossSystemEvent::builder("producer", "x")
                .priority(Priority::Critical)
                .build(),
        )
        .unwrap();

        let counter = Arc::clone(&attempts);
        wait_until(move || counter.load(Ordering::SeqCst) >= 2).await;
        c.shutdown(ShutdownMode::Drain).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(c.bus().dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_events_forwarded_through_transport() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.start();
        c.publish_event(CrossSystemEvent::builder("orders", "orders.created").build())
            .unwrap();
        c.shutdown(ShutdownMode::Drain).await;

        let topics: Vec<String> = h.transport.published().into_iter().map(|(topic, _)| topic).collect();
        assert_eq!(topics, vec!["orders.created".to_string()]);
    }
}
