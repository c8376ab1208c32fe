//! # Datastore Health
//!
//! Decides whether it is safe to talk to the primary store.
//!
//! - [`HealthMonitor`] - cached, windowed availability with throttled self-repair
//! - [`DatastoreProbe`] - the trait seam the monitor probes through
//! - [`PostgresProbe`] - production probe against PostgreSQL

pub mod monitor;
pub mod probe;

pub use monitor::{HealthMonitor, HealthStatus};
pub use probe::{DatastoreProbe, PostgresProbe, ProbeError};
