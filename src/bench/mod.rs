//! Benchmark domain model: desired spec, task descriptors and result stats.

pub mod spec;
pub mod stats;
pub mod task;

pub use spec::{BenchmarkSpec, DeletionPolicy, KafkaTopics, ProviderConfigReference, WorkloadClass};
pub use stats::{ConsumerStats, ProducerStats, ResultStats, RoundTripStats};
pub use task::{ExternalTaskView, FixedIds, IdSource, RandomIds, SeededIds, TaskDescriptor};
