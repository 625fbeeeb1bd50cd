//! Observability metrics for staffmail.
//!
//! Lock-free atomics rendered to Prometheus text on demand.

pub mod histogram;
pub mod registry;

pub use histogram::{Histogram, CHECK_COUNT_BUCKETS, LATENCY_BUCKETS_US};
pub use registry::{GeneratorMetrics, MetricsRegistry, ProvisionMetrics};
