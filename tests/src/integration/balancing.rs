//! # Load Balancing Scenarios
//!
//! Strategy behaviour through the coordinator and the instance pool.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ic_03_load_balancer::{LoadBalancer, SelectionError, Strategy};
    use proptest::prelude::*;
    use shared_types::ServiceInstance;

    use crate::integration::support::{fast_config, harness};

    fn trio() -> Vec<ServiceInstance> {
        ["i1", "i2", "i3"]
            .into_iter()
            .map(|host| ServiceInstance::new("api", host, 443))
            .collect()
    }

    #[tokio::test]
    async fn test_round_robin_nine_calls() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.set_load_balancing_strategy("round-robin").unwrap();
        let instances = trio();

        let picks: Vec<String> = (0..9)
            .map(|_| c.select_instance("api", &instances).unwrap().host)
            .collect();
        assert_eq!(
            picks,
            ["i1", "i2", "i3", "i1", "i2", "i3", "i1", "i2", "i3"]
        );
    }

    #[tokio::test]
    async fn test_health_based_skips_unhealthy() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.set_load_balancing_strategy("health-based").unwrap();
        let instances = vec![
            ServiceInstance::new("api", "i1", 443),
            ServiceInstance::new("api", "i2", 443).with_health(false),
        ];

        for _ in 0..50 {
            assert_eq!(c.select_instance("api", &instances).unwrap().host, "i1");
        }

        let all_down: Vec<ServiceInstance> = instances
            .into_iter()
            .map(|instance| instance.with_health(false))
            .collect();
        assert!(c.select_instance("api", &all_down).is_none());
    }

    #[tokio::test]
    async fn test_pool_follows_sweep_health() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        for instance in trio() {
            c.register_instance(instance);
        }
        c.register_system(shared_types::ServiceDescriptor::new("api"));
        h.probe.set_instance_down("i2:443", true);

        c.run_sweep().await;
        for _ in 0..20 {
            assert_ne!(c.select_from_pool("api").unwrap().host, "i2");
        }

        for host in ["i1", "i3"] {
            h.probe.set_instance_down(&format!("{host}:443"), true);
        }
        c.run_sweep().await;
        assert_eq!(
            c.select_from_pool("api"),
            Err(SelectionError::NoHealthyInstance {
                service: "api".into()
            })
        );
    }

    #[tokio::test]
    async fn test_least_connections_uses_pool_counts() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;
        c.set_load_balancing_strategy("least-connections").unwrap();
        for instance in trio() {
            c.register_instance(instance);
        }
        c.pool().acquire("api", "i1", 443);
        c.pool().acquire("api", "i2", 443);

        assert_eq!(c.select_from_pool("api").unwrap().host, "i3");
        c.pool().release("api", "i2", 443);
        assert_eq!(c.select_from_pool("api").unwrap().host, "i2");
    }

    proptest! {
        #[test]
        fn prop_round_robin_is_even(count in 1usize..8, rounds in 1usize..6) {
            let balancer = LoadBalancer::new(Strategy::RoundRobin);
            let instances: Vec<ServiceInstance> = (0..count)
                .map(|i| ServiceInstance::new("svc", format!("h{i}"), 80))
                .collect();

            let mut seen: HashMap<String, usize> = HashMap::new();
            for call in 0..count * rounds {
                let pick = balancer.select("svc", &instances).unwrap();
                prop_assert_eq!(&pick.host, &instances[call % count].host);
                *seen.entry(pick.host).or_default() += 1;
            }
            prop_assert_eq!(seen.len(), count);
            prop_assert!(seen.values().all(|&n| n == rounds));
        }
    }
}
