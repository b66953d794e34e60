//! Background work scheduled by the discovery service.
mod discovery;
mod metrics;

pub(crate) use discovery::evaluate;
pub use metrics::{DiscoveryMetrics, MetricsSnapshot};
