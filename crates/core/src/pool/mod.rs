mod circuit_breaker;
mod host_pool;
mod warmup;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use host_pool::HostPool;
pub use warmup::{spawn_periodic_warm_up, warm_up};
