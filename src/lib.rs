//! Bench coordinator: runs Kafka benchmark tasks on a pool of workload agents.

pub mod agent;
pub mod bench;
pub mod config;
pub mod controller;
pub mod error;
