//! Agent pool access.
//!
//! Core components:
//! - `resolver`: pool discovery (DNS headless service, static list)
//! - `wire`: status table wire types
//! - `decode`: status entry → typed results
//! - `service`: create fan-out, status collection, teardown

pub mod decode;
pub mod resolver;
pub mod service;
pub mod wire;

pub use decode::WorkerReport;
pub use resolver::{AgentAddr, DnsPoolResolver, PoolResolver, StaticPoolResolver};
pub use service::AgentService;
pub use wire::{AgentStatusEntry, AgentStatusResponse, StatusPayload};
