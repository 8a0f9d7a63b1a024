//! # Integration Core Benchmarks
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | Event Bus | publish + deliver one event to 3 handlers | < 50µs |
//! | Load Balancer | select over 16 instances | < 1µs |
//! | Validator | validate in a 50-system chain | < 100µs |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ic_01_service_registry::{DependencyValidator, HealthLookup, ServiceRegistry};
use ic_03_load_balancer::{LoadBalancer, Strategy};
use shared_bus::{BusConfig, CrossSystemEvent, EventBus, EventPublisher, FnHandler, RecordingPublisher};
use shared_types::{EventKind, HealthStatus, Priority, ServiceDescriptor, ServiceInstance};

// ============================================================================
// Event Bus
// ============================================================================

fn bench_event_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-bus");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let bus = runtime.block_on(async {
        let bus = EventBus::new(BusConfig::default());
        for name in ["audit", "billing", "search"] {
            bus.subscribe(EventKind::custom("orders.created"), Arc::new(FnHandler::new(name, |_| Ok(()))));
        }
        bus
    });

    for batch in [1usize, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("publish_and_deliver", batch), &batch, |b, &batch| {
            b.iter(|| {
                runtime.block_on(async {
                    for i in 0..batch {
                        let priority = if i % 10 == 0 { Priority::Critical } else { Priority::Medium };
                        bus.publish(
                            CrossSystemEvent::builder("orders", "orders.created")
                                .priority(priority)
                                .build(),
                        )
                        .expect("publish");
                    }
                    black_box(bus.process_pending().await)
                })
            })
        });
    }

    group.finish();
}

// ============================================================================
// Load Balancer
// ============================================================================

fn bench_load_balancer(c: &mut Criterion) {
    let mut group = c.benchmark_group("load-balancer");

    let instances: Vec<ServiceInstance> = (0..16)
        .map(|i| {
            ServiceInstance::new("api", format!("10.0.0.{i}"), 8080)
                .with_health(i % 3 != 0)
                .with_connections(i)
        })
        .collect();

    for strategy in Strategy::ALL {
        let balancer = LoadBalancer::new(strategy);
        group.bench_function(strategy.as_str(), |b| {
            b.iter(|| black_box(balancer.select("api", &instances)))
        });
    }

    group.finish();
}

// ============================================================================
// Dependency Validator
// ============================================================================

struct AllHealthy;

impl HealthLookup for AllHealthy {
    fn status_of(&self, _system: &str) -> HealthStatus {
        HealthStatus::Healthy
    }
}

fn bench_validator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency-validator");

    let registry = Arc::new(ServiceRegistry::new(Arc::new(RecordingPublisher::new())));
    for i in 0..50 {
        let mut descriptor = ServiceDescriptor::new(format!("s{i}"));
        if i > 0 {
            descriptor = descriptor.depends_on(format!("s{}", i - 1));
        }
        registry.register(descriptor);
    }
    let validator = DependencyValidator::new(registry, Arc::new(AllHealthy));

    group.bench_function("validate_chain_tail", |b| {
        b.iter(|| black_box(validator.validate("s49")))
    });

    group.finish();
}

criterion_group!(benches, bench_event_bus, bench_load_balancer, bench_validator);

criterion_main!(benches);
