//! Managed benchmark resources and the reconcile loop that drives them.

pub mod external;
pub mod reconciler;
pub mod resource;

pub use external::{BenchExternal, ExternalClient, ExternalCreation, ExternalObservation};
pub use reconciler::{ReconcileOutcome, Reconciler, RunOutcome};
pub use resource::{BenchResource, BenchStatus, Condition, ConditionKind, LifecyclePhase, Observation};
