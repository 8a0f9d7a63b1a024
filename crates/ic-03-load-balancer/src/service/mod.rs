//! Service Layer
//!
//! Selection over instance slices and the registered instance pool.

pub mod balancer;
pub mod pool;

pub use balancer::LoadBalancer;
pub use pool::InstancePool;
